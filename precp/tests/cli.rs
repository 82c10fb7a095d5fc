//! End-to-end coverage of the worked scenarios: run the binary against
//! a snippet on stdin, check what comes back on stdout.

use assert_cmd::Command;
use predicates::prelude::*;

fn precp() -> Command {
    Command::cargo_bin("precp").expect("binary built by the workspace")
}

fn run_stdin(input: &str) -> assert_cmd::assert::Assert {
    precp().write_stdin(input).assert()
}

#[test]
fn object_like_macro_expands() {
    run_stdin("#define X 42\nX\n")
        .success()
        .stdout("42\n");
}

#[test]
fn function_like_macro_substitutes_arguments() {
    run_stdin("#define ADD(a,b) a+b\nADD(1,2)\n")
        .success()
        .stdout("1+2\n");
}

#[test]
fn stringize_quotes_the_argument_text() {
    run_stdin("#define STR(x) #x\nSTR(hello)\n")
        .success()
        .stdout("\"hello\"\n");
}

#[test]
fn concatenation_glues_adjacent_arguments() {
    run_stdin("#define CAT(a,b) a##b\nCAT(foo,bar)\n")
        .success()
        .stdout("foobar\n");
}

#[test]
fn chained_object_like_macros_resolve_transitively() {
    run_stdin("#define A B\n#define B C\nA\n")
        .success()
        .stdout("C\n");
}

#[test]
fn if_zero_takes_the_else_branch() {
    run_stdin("#if 0\nX\n#else\nY\n#endif\n")
        .success()
        .stdout("Y\n");
}

#[test]
fn define_flag_predefines_a_macro() {
    precp()
        .arg("-D")
        .arg("GREETING=hi")
        .write_stdin("GREETING\n")
        .assert()
        .success()
        .stdout("hi\n");
}

#[test]
fn define_flag_without_value_defines_empty_body() {
    precp()
        .arg("-D")
        .arg("FLAG")
        .write_stdin("[FLAG]\n")
        .assert()
        .success()
        .stdout("[]\n");
}

#[test]
fn include_searches_the_dash_i_directory() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("greeting.h"), "#define GREETING hi\n").unwrap();

    precp()
        .arg("-I")
        .arg(dir.path())
        .write_stdin("#include <greeting.h>\nGREETING\n")
        .assert()
        .success()
        .stdout("hi\n");
}

#[test]
fn missing_include_is_a_failure() {
    run_stdin("#include <does-not-exist.h>\n")
        .failure()
        .stderr(predicate::str::contains("does-not-exist.h"));
}

#[test]
fn user_error_directive_fails_the_run() {
    run_stdin("#error boom\n").failure();
}

#[test]
fn undefined_macro_body_text_passes_through_unchanged() {
    run_stdin("hello,   world\n")
        .success()
        .stdout("hello, world\n");
}
