extern crate jackc;

use jackc::driver::{self, Options};
use std::fs;
use std::io;
use std::path::Path;

fn compile_str(text: &str) -> Result<Vec<String>, String> {
    let mut output = Vec::new();
    driver::compile_source(text.as_bytes(), "Test.jack", &mut output).map_err(|e| e.to_string())?;

    let output = String::from_utf8(output).unwrap();
    Ok(output.lines().map(str::to_owned).collect())
}

fn compile_demo(path: &str) -> Vec<String> {
    let mut output = Vec::new();
    driver::compile_file(Path::new(path), Options::empty(), &mut output).unwrap();

    let output = String::from_utf8(output).unwrap();
    output.lines().map(str::to_owned).collect()
}

#[test]
fn test_demos() {
    for entry in fs::read_dir("./demos").unwrap() {
        let dir = entry.unwrap().path();
        if !dir.is_dir() {
            continue;
        }

        let sources = driver::collect_sources(&dir).unwrap();
        assert!(!sources.is_empty(), "{} has no sources", dir.display());

        for source in sources {
            let mut output = Vec::new();
            let result = driver::compile_file(&source, Options::empty(), &mut output);
            assert!(
                result.is_ok(),
                "sample program {} returned an error: {}",
                source.display(),
                result.unwrap_err()
            );

            let output = String::from_utf8(output).unwrap();
            assert!(output.starts_with("function "));
            assert!(output.ends_with("return\n"));
        }
    }
}

#[test]
fn test_every_line_is_one_instruction() {
    let lines = compile_demo("demos/Square/SquareGame.jack");

    for line in lines {
        let words: Vec<_> = line.split(' ').collect();
        let arity = match words[0] {
            "push" | "pop" | "function" | "call" => 3,
            "label" | "goto" | "if-goto" => 2,
            "add" | "sub" | "neg" | "eq" | "gt" | "lt" | "and" | "or" | "not" | "return" => 1,
            _ => panic!("unknown instruction: {}", line),
        };

        assert_eq!(words.len(), arity, "malformed instruction: {}", line);
    }
}

#[test]
fn test_seven() {
    assert_eq!(
        compile_demo("demos/Seven/Main.jack"),
        [
            "function Main.main 0",
            "push constant 1",
            "push constant 2",
            "push constant 3",
            "call Math.multiply 2",
            "add",
            "call Output.printInt 1",
            "pop temp 0",
            "push constant 0",
            "return",
        ]
    );
}

#[test]
fn test_object_lifecycle() {
    assert_eq!(
        compile_demo("demos/Square/Main.jack"),
        [
            "function Main.main 1",
            "call SquareGame.new 0",
            "pop local 0",
            "push local 0",
            "call SquareGame.run 1",
            "pop temp 0",
            "push local 0",
            "call SquareGame.dispose 1",
            "pop temp 0",
            "push constant 0",
            "return",
        ]
    );

    let game = compile_demo("demos/Square/SquareGame.jack");
    assert_eq!(
        &game[..13],
        [
            "function SquareGame.new 0",
            "push constant 2",
            "call Memory.alloc 1",
            "pop pointer 0",
            "push constant 0",
            "push constant 0",
            "push constant 30",
            "call Square.new 3",
            "pop this 0",
            "push constant 0",
            "pop this 1",
            "push pointer 0",
            "return",
        ]
    );

    // `do square.dispose()` pasa el campo como receptor
    assert_eq!(
        &game[13..19],
        [
            "function SquareGame.dispose 0",
            "push argument 0",
            "pop pointer 0",
            "push this 0",
            "call Square.dispose 1",
            "pop temp 0",
        ]
    );
}

#[test]
fn test_array_loop() {
    let lines = compile_demo("demos/Average/Main.jack");
    assert_eq!(lines[0], "function Main.main 4");

    let start = lines.iter().position(|line| line == "label WHILE_START0").unwrap();
    assert_eq!(
        &lines[start..start + 14],
        [
            "label WHILE_START0",
            "push local 2",
            "push local 1",
            "lt",
            "not",
            "if-goto WHILE_END0",
            "push local 0",
            "push local 2",
            "add",
            "push constant 16",
            "call String.new 1",
            "push constant 69",
            "call String.appendChar 2",
            "push constant 110",
        ]
    );

    let end = lines.iter().position(|line| line == "label WHILE_END0").unwrap();
    assert_eq!(
        &lines[end - 18..=end],
        [
            "call Keyboard.readInt 1",
            "pop temp 0",
            "pop pointer 1",
            "push temp 0",
            "pop that 0",
            "push local 3",
            "push local 0",
            "push local 2",
            "add",
            "pop pointer 1",
            "push that 0",
            "add",
            "pop local 3",
            "push local 2",
            "push constant 1",
            "add",
            "pop local 2",
            "goto WHILE_START0",
            "label WHILE_END0",
        ]
    );
}

#[test]
fn test_nested_control_flow() {
    let lines = compile_str(
        "class Main {
            function int abs(int x) {
                if (x < 0) {
                    return -x;
                } else {
                    while (false) {}
                }
                return x;
            }
        }",
    )
    .unwrap();

    assert_eq!(
        lines,
        [
            "function Main.abs 0",
            "push argument 0",
            "push constant 0",
            "lt",
            "not",
            "if-goto IF_ELSE0",
            "push argument 0",
            "neg",
            "return",
            "goto IF_END0",
            "label IF_ELSE0",
            "label WHILE_START1",
            "push constant 0",
            "not",
            "if-goto WHILE_END1",
            "goto WHILE_START1",
            "label WHILE_END1",
            "label IF_END0",
            "push argument 0",
            "return",
        ]
    );
}

#[test]
fn test_lexical_errors_are_all_reported() {
    let text = "class Main {\n  $\n  static int x = 40000;\n  \"open\n}\n";
    let error = compile_str(text).unwrap_err();

    assert!(error.contains("Bad character '$'"), "{}", error);
    assert!(error.ends_with("Compilation failed with 3 errors\n"), "{}", error);
}

#[test]
fn test_compile_error_report() {
    let error = compile_str("class Main {\n  function void main() {\n    do nothing.at(all)\n  }\n}\n")
        .unwrap_err();

    assert!(error.starts_with("Compile error: Symbol `all` is undefined\n"), "{}", error);
    assert!(error.contains(" --> Test.jack:[3:19-3:21]\n"), "{}", error);
    assert!(error.contains("3 |     do nothing.at(all)\n"), "{}", error);
}

#[test]
fn test_invalid_utf8() {
    let mut output = Vec::new();
    let error = driver::compile_source(&b"class \xff {}\n"[..], "Bad.jack", &mut output).unwrap_err();

    assert_eq!(error.len(), 1);
    assert!(error.to_string().starts_with("Lexical error: I/O error\n"), "{}", error);
    assert!(output.is_empty());
}

#[test]
fn test_string_characters_fit_in_constants() {
    let error = compile_str("class Main {\n  function void f() { do g(\"\u{9000}\"); return; }\n}\n")
        .unwrap_err();

    assert!(error.starts_with("Lexical error: Bad character '\u{9000}'"), "{}", error);
}

#[test]
fn test_empty_source() {
    assert!(compile_str("").is_err());
    assert!(compile_str("// only a comment\n").is_err());
    assert!(driver::compile_source("class Empty {}".as_bytes(), "Empty.jack", io::sink()).is_ok());
}
