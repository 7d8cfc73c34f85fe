mod common;

use brainjit_core::{compile_to_bytecode, Config, Error, Reason, RuntimeError, Tape};

use common::{scripted_io, take_output, ALL_BYTES, HELLO_WORLD};

fn run(source: &str, input: &[u8]) -> Result<(Vec<u8>, Tape), RuntimeError> {
    let config = Config::default();
    let program = compile_to_bytecode(source.as_bytes(), &config).unwrap();
    let mut tape = Tape::new(config.tape_len);

    program.run(&mut tape, scripted_io(input))?;

    Ok((take_output(), tape))
}

fn compilation_failure(source: &str, config: &Config) -> Reason {
    match compile_to_bytecode(source.as_bytes(), config) {
        Err(Error::Compilation(error)) => error.reason(),
        Err(other) => panic!("expected a compilation error, got {:?}", other),
        Ok(_) => panic!("expected {:?} not to compile", source),
    }
}

#[test]
fn increment_five_times_then_output() {
    let (output, _) = run("+++++.", b"").unwrap();
    assert_eq!(vec![5], output);
}

#[test]
fn echoes_every_byte() {
    for byte in 0..=255u8 {
        let (output, _) = run(",.", &[byte]).unwrap();
        assert_eq!(vec![byte], output);
    }
}

#[test]
fn decrement_loop_clears_the_cell() {
    for start in [1usize, 2, 127, 128, 255] {
        let source = format!("{}[-]", "+".repeat(start));
        let (output, tape) = run(&source, b"").unwrap();
        assert!(output.is_empty());
        assert_eq!(0, tape.cells()[0], "starting from {}", start);
    }
}

#[test]
fn loop_on_zero_cell_is_skipped() {
    let (output, _) = run("[.]+.", b"").unwrap();
    assert_eq!(vec![1], output);
}

#[test]
fn hello_world() {
    let (output, _) = run(HELLO_WORLD, b"").unwrap();
    assert_eq!(b"Hello World!\n".to_vec(), output);
}

#[test]
fn all_bytes() {
    let (output, _) = run(ALL_BYTES, b"").unwrap();
    assert_eq!((0..=255u8).collect::<Vec<_>>(), output);
}

#[test]
fn reading_past_the_input_gives_eof_byte() {
    let (output, _) = run(",.,.", b"A").unwrap();
    assert_eq!(vec![b'A', 0xFF], output);
}

#[test]
fn moving_off_either_end_of_the_tape_is_an_error() {
    assert_eq!(Err(RuntimeError::PointerOutOfBounds), run("<", b"").map(|_| ()));

    let config = Config {
        tape_len: 4,
        ..Config::default()
    };
    let program = compile_to_bytecode(b">>>+>+", &config).unwrap();
    let mut tape = Tape::new(config.tape_len);
    assert_eq!(
        Err(RuntimeError::PointerOutOfBounds),
        program.run(&mut tape, scripted_io(b""))
    );
    // everything before the fault happened
    assert_eq!(&[0, 0, 0, 1], tape.cells());
}

#[test]
fn brackets_must_balance() {
    let config = Config::default();
    assert!(compile_to_bytecode(b"[[][]]", &config).is_ok());
    assert!(compile_to_bytecode(b"no symbols at all", &config).is_ok());

    assert_eq!(
        Reason::TooManyCloseBrackets,
        compilation_failure("[]]", &config)
    );
    assert_eq!(
        Reason::TooManyCloseBrackets,
        compilation_failure("][", &config)
    );
    assert_eq!(
        Reason::NotEnoughCloseBrackets { open_loops: 2 },
        compilation_failure("[[[]", &config)
    );
}

#[test]
fn nesting_at_the_limit_compiles_one_more_does_not() {
    let config = Config {
        max_loop_depth: 5,
        ..Config::default()
    };
    let at_limit = format!("+{}-{}", "[".repeat(5), "]".repeat(5));
    let over_limit = format!("+{}-{}", "[".repeat(6), "]".repeat(6));

    let program = compile_to_bytecode(at_limit.as_bytes(), &config).unwrap();
    program
        .run(&mut Tape::new(config.tape_len), scripted_io(b""))
        .unwrap();

    assert_eq!(
        Reason::NestingTooDeep { max_depth: 5 },
        compilation_failure(&over_limit, &config)
    );
}

#[test]
fn code_capacity_applies_to_bytecode_too() {
    let config = Config {
        code_capacity: 8,
        ..Config::default()
    };
    assert!(compile_to_bytecode(b"+.+.+.", &config).is_ok());
    assert_eq!(
        Reason::CodeBufferFull { capacity: 8 },
        compilation_failure("+.+.+.+.+.", &config)
    );
}

#[test]
fn compiling_twice_gives_identical_bytecode() {
    let config = Config::default();
    let first = compile_to_bytecode(HELLO_WORLD.as_bytes(), &config).unwrap();
    let second = compile_to_bytecode(HELLO_WORLD.as_bytes(), &config).unwrap();
    assert_eq!(first.bytecode(), second.bytecode());
}

#[test]
fn invalid_config_is_rejected() {
    let config = Config {
        tape_len: 0,
        ..Config::default()
    };
    assert!(matches!(
        compile_to_bytecode(b"+", &config),
        Err(Error::Config(_))
    ));
}
