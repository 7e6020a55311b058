use std::fs;
use std::io;

use serde::Serialize;

use kkc_core::converter::{ConvertError, ImmutableConverter, Node, NodeId};
use kkc_core::key_corrector::KeyCorrector;
use kkc_core::segments::{Candidate, Segments};

use super::{load_converter, load_settings, TablePaths};

pub struct ConvertOptions<'a> {
    pub settings: Option<&'a str>,
    /// Candidates to print per segment.
    pub n: usize,
    /// `(segment index, new length)` pairs applied in order after conversion.
    pub resize: &'a [(usize, usize)],
    pub json: bool,
}

/// Parse an `INDEX:LEN` resize request.
pub fn parse_resize(s: &str) -> Result<(usize, usize), String> {
    let (index, len) = s
        .split_once(':')
        .ok_or_else(|| format!("expected INDEX:LEN, got '{s}'"))?;
    let index = index
        .trim()
        .parse()
        .map_err(|e| format!("invalid index '{index}': {e}"))?;
    let len = len
        .trim()
        .parse()
        .map_err(|e| format!("invalid length '{len}': {e}"))?;
    Ok((index, len))
}

pub fn convert_cmd(paths: &TablePaths<'_>, kana: &str, opts: &ConvertOptions<'_>) {
    let converter = load_converter(paths, load_settings(opts.settings));
    let mut segments = die!(converter.convert(kana), "Error converting: {}");
    for &(index, len) in opts.resize {
        die!(
            converter.resize_segment(&mut segments, index, len),
            "Error resizing segment {index} to {len}: {}"
        );
    }

    if opts.json {
        println!(
            "{}",
            die!(serde_json::to_string_pretty(&segments), "Error: {}")
        );
        return;
    }
    print_segments(&segments, opts.n);
}

fn print_segments(segments: &Segments, n: usize) {
    for (i, seg) in segments.conversion_segments().iter().enumerate() {
        println!("[{i}] {} ({:?})", seg.key(), seg.segment_type());
        for (j, c) in seg.candidates().iter().take(n).enumerate() {
            println!("  #{:>2}: {}", j + 1, describe(c));
        }
    }
    println!("{segments}");
}

fn describe(c: &Candidate) -> String {
    let mut out = format!(
        "{} ({}) cost={} wcost={} lid={} rid={}",
        c.value, c.key, c.cost, c.wcost, c.lid, c.rid
    );
    if c.structure_cost != 0 {
        out.push_str(&format!(" structure={}", c.structure_cost));
    }
    if !c.attributes.is_empty() {
        out.push_str(&format!(" attrs={:#x}", c.attributes.bits()));
    }
    if c.content_value != c.value {
        out.push_str(&format!(" content={}", c.content_value));
    }
    out
}

pub fn nbest_cmd(paths: &TablePaths<'_>, kana: &str, n: usize, settings: Option<&str>, json: bool) {
    let converter = load_converter(paths, load_settings(settings));
    let results = die!(converter.nbest_paths(kana, n), "Error converting: {}");
    if json {
        println!("{}", die!(serde_json::to_string_pretty(&results), "Error: {}"));
        return;
    }
    for (i, c) in results.iter().enumerate() {
        let parts: Vec<&str> = c.inner_segments().iter().map(|s| s.value).collect();
        println!("#{:>2}: {}  cost={}", i + 1, parts.join(" | "), c.cost);
    }
}

#[derive(Serialize)]
struct LatticeReport<'a> {
    key: &'a str,
    nodes: Vec<NodeReport<'a>>,
    best_path: Vec<NodeId>,
    total_cost: Option<i64>,
}

#[derive(Serialize)]
struct NodeReport<'a> {
    id: NodeId,
    #[serde(flatten)]
    node: &'a Node,
    best_cost: Option<i64>,
}

pub fn lattice_cmd(paths: &TablePaths<'_>, kana: &str, settings: Option<&str>, json: bool) {
    let converter = load_converter(paths, load_settings(settings));
    let (lattice, path) = die!(converter.build_lattice(kana), "Error converting: {}");
    let report = LatticeReport {
        key: lattice.key(),
        nodes: lattice
            .nodes()
            .iter()
            .enumerate()
            .map(|(id, node)| NodeReport {
                id,
                node,
                best_cost: lattice.best_cost(id),
            })
            .collect(),
        best_path: path,
        total_cost: lattice.best_cost(lattice.eos()),
    };

    if json {
        println!("{}", die!(serde_json::to_string_pretty(&report), "Error: {}"));
        return;
    }
    println!(
        "{} nodes ({} words), total cost {:?}",
        report.nodes.len(),
        lattice.word_node_count(),
        report.total_cost
    );
    for r in &report.nodes {
        let marker = if report.best_path.contains(&r.id) { "*" } else { " " };
        println!(
            "{marker} {:>4} [{:>3},{:>3}) {:?} {} ({}) lid={} rid={} wcost={} best={:?}{}{}",
            r.id,
            r.node.begin,
            r.node.end,
            r.node.kind,
            r.node.value,
            r.node.key,
            r.node.lid,
            r.node.rid,
            r.node.wcost,
            r.best_cost,
            if r.node.key_corrected { " corrected" } else { "" },
            if r.node.exact_match { " exact" } else { "" },
        );
    }
}

pub fn correct_cmd(kana: &str, settings: Option<&str>, json: bool) {
    let settings = load_settings(settings);
    let corrector = KeyCorrector::new(true, settings.correction.max_key_len);
    let corrected = corrector.correct(kana);

    if json {
        #[derive(Serialize)]
        struct Row<'a> {
            key: &'a str,
            changed: &'a [(usize, usize)],
        }
        let rows: Vec<Row<'_>> = corrected
            .iter()
            .map(|c| Row {
                key: &c.key,
                changed: c.changed_ranges(),
            })
            .collect();
        println!("{}", die!(serde_json::to_string_pretty(&rows), "Error: {}"));
        return;
    }
    for c in &corrected {
        if c.is_identity() {
            println!("{} (unchanged)", c.key);
        } else {
            println!("{} changed={:?}", c.key, c.changed_ranges());
        }
    }
}

/// Convert one reading per input line and print `reading<TAB>result`.
///
/// Errors are reported inline so one bad line does not stop the batch.
pub fn batch_cmd(paths: &TablePaths<'_>, input_file: Option<&str>, settings: Option<&str>) {
    let converter = load_converter(paths, load_settings(settings));
    let text = match input_file {
        Some(path) => die!(fs::read_to_string(path), "Error reading {path}: {}"),
        None => die!(io::read_to_string(io::stdin()), "Error reading stdin: {}"),
    };
    let mut ok = 0usize;
    let mut failed = 0usize;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match convert_line(&converter, line) {
            Ok(result) => {
                ok += 1;
                println!("{line}\t{result}");
            }
            Err(e) => {
                failed += 1;
                println!("{line}\tERROR: {e}");
            }
        }
    }
    eprintln!("{ok} converted, {failed} failed");
}

fn convert_line(converter: &ImmutableConverter, kana: &str) -> Result<String, ConvertError> {
    converter.convert(kana).map(|segments| segments.to_string())
}
