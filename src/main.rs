use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use log::{info, warn, LevelFilter};
use structopt::StructOpt;

use brainjit_core::{compile_to_bytecode, jit_compile, Config, Io, Tape, NATIVE_SUPPORTED};

#[derive(Debug, StructOpt)]
#[structopt(name = "brainjit", about = "Compiles a tape program to machine code and runs it.")]
struct Opt {
    /// Interpret portable bytecode instead of running native code
    #[structopt(short, long)]
    interpret: bool,

    /// Report how long compiling and running took
    #[structopt(short, long)]
    time: bool,

    /// Size of the code buffer, in bytes
    #[structopt(long, default_value = "65536")]
    code_capacity: usize,

    /// How deeply loops may nest
    #[structopt(long, default_value = "256")]
    max_loop_depth: usize,

    /// Number of cells on the tape
    #[structopt(long, default_value = "30000")]
    tape_len: usize,

    /// Source file
    #[structopt(parse(from_os_str))]
    file: PathBuf,
}

fn main() {
    let opt = Opt::from_args();
    init_logging(opt.time);

    let result = run(&opt);
    // Whatever the program printed without a trailing newline.
    if let Err(e) = io::stdout().flush() {
        warn!("could not flush stdout: {}", e);
    }

    if let Err(e) = result {
        eprintln!("{}: {}", opt.file.display(), e);
        process::exit(1);
    }
}

fn init_logging(time: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if time {
        builder.filter_module("brainjit", LevelFilter::Info);
    }
    builder.init();
}

fn run(opt: &Opt) -> Result<(), Box<dyn Error>> {
    let source = fs::read(&opt.file)?;
    let config = Config {
        code_capacity: opt.code_capacity,
        max_loop_depth: opt.max_loop_depth,
        tape_len: opt.tape_len,
    };

    if opt.interpret || !NATIVE_SUPPORTED {
        if !opt.interpret {
            warn!("native code is not supported on this host; interpreting instead");
        }
        return interpret(&source, &config);
    }

    let start = Instant::now();
    let mut program = jit_compile(&source, &config)?;
    info!(
        "compiled {} bytes of machine code in {:?}",
        program.code().len(),
        start.elapsed()
    );

    let start = Instant::now();
    let result = program.run();
    info!("ran in {:?}", start.elapsed());

    Ok(result?)
}

fn interpret(source: &[u8], config: &Config) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let program = compile_to_bytecode(source, config)?;
    info!(
        "compiled {} bytes of bytecode in {:?}",
        program.bytecode().len(),
        start.elapsed()
    );

    let mut tape = Tape::new(config.tape_len);
    let start = Instant::now();
    let result = program.run(&mut tape, Io::stdio());
    info!("interpreted in {:?}", start.elapsed());

    Ok(result?)
}
