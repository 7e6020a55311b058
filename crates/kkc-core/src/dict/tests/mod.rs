mod segmenter;
