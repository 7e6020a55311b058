use std::path::Path;
use std::sync::Arc;

use kkc_core::converter::ImmutableConverter;
use kkc_core::dict::{Connector, MemoryDictionary, Segmenter};
use kkc_core::settings::{parse_settings_toml, Settings};

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            std::process::exit(1);
        })
    };
}

pub mod config_ops;
pub mod convert_ops;
pub mod table_ops;

/// Paths of the three compiled files a converter needs.
pub struct TablePaths<'a> {
    pub dict_file: &'a str,
    pub conn_file: &'a str,
    pub seg_file: &'a str,
}

pub(crate) fn load_settings(path: Option<&str>) -> Settings {
    match path {
        Some(path) => {
            let content = die!(std::fs::read_to_string(path), "Error reading {path}: {}");
            die!(parse_settings_toml(&content), "Error in {path}: {}")
        }
        None => Settings::default(),
    }
}

/// Open all tables or exit. A missing or corrupt table is fatal.
pub(crate) fn load_converter(paths: &TablePaths<'_>, settings: Settings) -> ImmutableConverter {
    let dict = die!(
        MemoryDictionary::open(Path::new(paths.dict_file)),
        "Error opening dictionary: {}"
    );
    let conn = die!(
        Connector::open(Path::new(paths.conn_file)),
        "Error opening connector: {}"
    );
    let seg = die!(
        Segmenter::open(Path::new(paths.seg_file)),
        "Error opening segmenter: {}"
    );
    if conn.num_left() < seg.num_ids() || conn.num_right() < seg.num_ids() {
        eprintln!(
            "Warning: connector is {}x{} but segmenter covers {} ids; missing pairs use the default cost",
            conn.num_left(),
            conn.num_right(),
            seg.num_ids()
        );
    }
    ImmutableConverter::with_settings(Arc::new(dict), Arc::new(conn), Arc::new(seg), settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::table_ops::{compile_conn, compile_dict, compile_seg, ConnOptions};

    #[test]
    fn test_compiled_tables_convert() {
        let dir = tempfile::tempdir().unwrap();
        let path = |name: &str| dir.path().join(name).to_string_lossy().into_owned();

        std::fs::write(
            path("dict.tsv"),
            "# key\tlid\trid\tcost\tvalue\nきょう\t2\t2\t3000\t今日\nきょう\t2\t2\t5000\t京\nは\t3\t3\t2000\tは\n",
        )
        .unwrap();
        // ids: 0 BOS/EOS, 1 unknown, 2 noun, 3 particle
        std::fs::write(path("matrix.txt"), format!("4\n{}", "0\n".repeat(16))).unwrap();
        std::fs::write(path("rules.txt"), "4\n* * B\n2 3 N\n").unwrap();

        compile_dict(&path("dict.tsv"), &path("test.dict"));
        compile_conn(
            &path("matrix.txt"),
            &path("test.conn"),
            &ConnOptions {
                default_cost: 5000,
                function_words: Some((3, 3)),
            },
        );
        compile_seg(&path("rules.txt"), &path("test.seg"));

        let (dict_file, conn_file, seg_file) = (path("test.dict"), path("test.conn"), path("test.seg"));
        let converter = load_converter(
            &TablePaths {
                dict_file: &dict_file,
                conn_file: &conn_file,
                seg_file: &seg_file,
            },
            load_settings(None),
        );
        let segments = converter.convert("きょうは").unwrap();
        assert_eq!(segments.conversion_segments_size(), 1);
        assert_eq!(segments.to_string(), "今日は");
        let top = segments.conversion_segment(0).unwrap();
        assert_eq!(top.candidate(1).unwrap().value, "京は");
    }
}
