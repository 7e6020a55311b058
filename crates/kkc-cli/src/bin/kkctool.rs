use clap::{Args, Parser, Subcommand};

use kkc_cli::commands::convert_ops::{self, ConvertOptions};
use kkc_cli::commands::table_ops::{self, ConnOptions};
use kkc_cli::commands::{config_ops, TablePaths};
use kkc_cli::trace_init::init_tracing;

#[derive(Parser)]
#[command(name = "kkctool", about = "Kana-kanji conversion tables and diagnostics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Tables {
    /// Compiled dictionary file (.dict)
    dict_file: String,
    /// Compiled connector file (.conn)
    conn_file: String,
    /// Compiled segmenter file (.seg)
    seg_file: String,
    /// Settings TOML overriding the embedded defaults
    #[arg(long)]
    settings: Option<String>,
}

impl Tables {
    fn paths(&self) -> TablePaths<'_> {
        TablePaths {
            dict_file: &self.dict_file,
            conn_file: &self.conn_file,
            seg_file: &self.seg_file,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Convert kana into segments with ranked candidates
    Convert {
        #[command(flatten)]
        tables: Tables,
        /// Kana input
        kana: String,
        /// Candidates to show per segment
        #[arg(short, long, default_value = "5")]
        n: usize,
        /// Resize a segment after conversion, as INDEX:LEN (repeatable)
        #[arg(long, value_parser = convert_ops::parse_resize)]
        resize: Vec<(usize, usize)>,
        /// Output segments as JSON
        #[arg(long)]
        json: bool,
    },
    /// Convert one reading per line from a file (or stdin)
    Batch {
        #[command(flatten)]
        tables: Tables,
        /// Input file; reads stdin when omitted
        input_file: Option<String>,
    },
    /// Show raw N-best paths over the whole input
    Nbest {
        #[command(flatten)]
        tables: Tables,
        /// Kana input
        kana: String,
        /// Number of paths
        #[arg(short, long, default_value = "10")]
        n: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Dump the lattice and its best path
    Lattice {
        #[command(flatten)]
        tables: Tables,
        /// Kana input
        kana: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the typo-corrected variants of a key
    Correct {
        /// Kana input
        kana: String,
        /// Settings TOML overriding the embedded defaults
        #[arg(long)]
        settings: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up entries whose reading is a prefix of the query
    Lookup {
        /// Compiled dictionary file
        dict_file: String,
        /// Query (hiragana)
        query: String,
    },
    /// Look up the transition cost between POS ids
    ConnCost {
        /// Compiled connector file
        conn_file: String,
        /// Right id of the previous word
        left: u16,
        /// Left id of the next word
        right: u16,
        /// Compiled segmenter file, to also show boundary rules
        #[arg(long)]
        seg: Option<String>,
    },
    /// Compile a dictionary from Mozc-style TSV (key, lid, rid, cost, value)
    CompileDict {
        /// Input TSV file
        input_tsv: String,
        /// Output binary file
        output_file: String,
    },
    /// Compile a connector from a Mozc or MeCab matrix text file
    CompileConn {
        /// Input text file
        input_txt: String,
        /// Output binary file
        output_file: String,
        /// Cost of transitions not stored in the table
        #[arg(long, default_value = "5000")]
        default_cost: u16,
        /// Lowest function-word POS id
        #[arg(long, requires = "fw_max")]
        fw_min: Option<u16>,
        /// Highest function-word POS id
        #[arg(long, requires = "fw_min")]
        fw_max: Option<u16>,
    },
    /// Compile segmenter boundary rules
    CompileSeg {
        /// Input rules file
        input_txt: String,
        /// Output binary file
        output_file: String,
    },
    /// Show info about a compiled file (auto-detected by magic bytes)
    Info {
        /// Dictionary, connector or segmenter file
        file: String,
    },
    /// Export default settings as TOML
    SettingsExport,
    /// Validate a custom settings TOML file
    SettingsValidate {
        /// Path to the TOML file
        file: String,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Convert {
            tables,
            kana,
            n,
            resize,
            json,
        } => {
            let opts = ConvertOptions {
                settings: tables.settings.as_deref(),
                n,
                resize: &resize,
                json,
            };
            convert_ops::convert_cmd(&tables.paths(), &kana, &opts);
        }
        Command::Batch { tables, input_file } => convert_ops::batch_cmd(
            &tables.paths(),
            input_file.as_deref(),
            tables.settings.as_deref(),
        ),
        Command::Nbest {
            tables,
            kana,
            n,
            json,
        } => convert_ops::nbest_cmd(&tables.paths(), &kana, n, tables.settings.as_deref(), json),
        Command::Lattice { tables, kana, json } => {
            convert_ops::lattice_cmd(&tables.paths(), &kana, tables.settings.as_deref(), json)
        }
        Command::Correct {
            kana,
            settings,
            json,
        } => convert_ops::correct_cmd(&kana, settings.as_deref(), json),
        Command::Lookup { dict_file, query } => table_ops::lookup(&dict_file, &query),
        Command::ConnCost {
            conn_file,
            left,
            right,
            seg,
        } => table_ops::conn_cost_cmd(&conn_file, seg.as_deref(), left, right),
        Command::CompileDict {
            input_tsv,
            output_file,
        } => table_ops::compile_dict(&input_tsv, &output_file),
        Command::CompileConn {
            input_txt,
            output_file,
            default_cost,
            fw_min,
            fw_max,
        } => {
            let opts = ConnOptions {
                default_cost,
                function_words: fw_min.zip(fw_max),
            };
            table_ops::compile_conn(&input_txt, &output_file, &opts);
        }
        Command::CompileSeg {
            input_txt,
            output_file,
        } => table_ops::compile_seg(&input_txt, &output_file),
        Command::Info { file } => table_ops::info(&file),
        Command::SettingsExport => config_ops::settings_export(),
        Command::SettingsValidate { file } => config_ops::settings_validate(&file),
    }
}
