use std::fs;
use std::path::Path;
use std::process;

use kkc_core::dict::{Connector, Dictionary, MemoryDictionary, Segmenter, SegmenterBuilder};

pub struct ConnOptions {
    pub default_cost: u16,
    /// Inclusive function-word POS id range, if known.
    pub function_words: Option<(u16, u16)>,
}

pub fn compile_conn(input_txt: &str, output_file: &str, opts: &ConnOptions) {
    let text = die!(
        fs::read_to_string(input_txt),
        "Error reading {input_txt}: {}"
    );
    let (fw_min, fw_max) = opts.function_words.unwrap_or((0, 0));
    if fw_min > fw_max {
        eprintln!("Error: function-word range {fw_min}..={fw_max} is empty");
        process::exit(1);
    }
    let conn = die!(
        Connector::from_text_with_metadata(&text, opts.default_cost, fw_min, fw_max),
        "Error parsing connector: {}"
    );
    die!(
        conn.save(Path::new(output_file)),
        "Error writing {output_file}: {}"
    );
    eprintln!(
        "Wrote {output_file}: {}x{}, {} stored costs, {} bytes",
        conn.num_left(),
        conn.num_right(),
        conn.value_count(),
        conn.byte_len()
    );
}

pub fn compile_seg(input_txt: &str, output_file: &str) {
    let text = die!(
        fs::read_to_string(input_txt),
        "Error reading {input_txt}: {}"
    );
    let builder = die!(
        SegmenterBuilder::from_text(&text),
        "Error parsing segmenter rules: {}"
    );
    let seg = die!(builder.build(), "Error building segmenter: {}");
    die!(
        seg.save(Path::new(output_file)),
        "Error writing {output_file}: {}"
    );
    let (r_classes, l_classes) = seg.class_counts();
    eprintln!(
        "Wrote {output_file}: {} ids, {r_classes} right classes, {l_classes} left classes",
        seg.num_ids()
    );
}

pub fn compile_dict(input_tsv: &str, output_file: &str) {
    let text = die!(
        fs::read_to_string(input_tsv),
        "Error reading {input_tsv}: {}"
    );
    let dict = die!(
        MemoryDictionary::from_text(&text),
        "Error parsing dictionary: {}"
    );
    die!(
        dict.save(Path::new(output_file)),
        "Error writing {output_file}: {}"
    );
    let (readings, entries) = dict.stats();
    eprintln!("Wrote {output_file}: {readings} readings, {entries} entries");
}

/// Describe a compiled file, detected by its magic bytes.
pub fn info(file: &str) {
    let data = die!(fs::read(file), "Error reading {file}: {}");
    match data.get(..4) {
        Some(b"KKDX") => {
            let dict = die!(MemoryDictionary::from_bytes(&data), "Error: {}");
            let (readings, entries) = dict.stats();
            println!("dictionary: {readings} readings, {entries} entries");
        }
        Some(b"KKCN") => {
            let conn = die!(Connector::from_bytes(&data), "Error: {}");
            let (fw_min, fw_max) = conn.function_word_range();
            println!(
                "connector: {}x{}, default cost {}, {} stored costs, function words {fw_min}..={fw_max}",
                conn.num_left(),
                conn.num_right(),
                conn.default_cost(),
                conn.value_count()
            );
        }
        Some(b"KKSG") => {
            let seg = die!(Segmenter::from_bytes(&data), "Error: {}");
            let (r_classes, l_classes) = seg.class_counts();
            println!(
                "segmenter: {} ids, {r_classes} right classes, {l_classes} left classes",
                seg.num_ids()
            );
        }
        _ => {
            eprintln!("Error: {file} is not a compiled dictionary, connector or segmenter");
            process::exit(1);
        }
    }
    println!("size: {} bytes", data.len());
}

pub fn conn_cost_cmd(conn_file: &str, seg_file: Option<&str>, left: u16, right: u16) {
    let conn = die!(
        Connector::open(Path::new(conn_file)),
        "Error opening connector: {}"
    );
    let fw = |id: u16| if conn.is_function_word(id) { "(fw)" } else { "" };
    print!(
        "cost({left}{}, {right}{}) = {}",
        fw(left),
        fw(right),
        conn.cost(left, right)
    );
    if let Some(seg_file) = seg_file {
        let seg = die!(
            Segmenter::open(Path::new(seg_file)),
            "Error opening segmenter: {}"
        );
        print!(
            "  boundary={} never_co_occur={}",
            seg.is_boundary(left, right),
            seg.never_co_occur(left, right)
        );
    }
    println!();
}

/// Entries whose reading is a prefix of `query`.
pub fn lookup(dict_file: &str, query: &str) {
    let dict = die!(
        MemoryDictionary::open(Path::new(dict_file)),
        "Error opening dictionary: {}"
    );
    let entries = dict.lookup_prefix(query, 0);
    if entries.is_empty() {
        println!("(no entries)");
        return;
    }
    for e in entries {
        println!(
            "{}\t{}\tlid={} rid={} cost={}",
            e.key, e.value, e.lid, e.rid, e.cost
        );
    }
}
