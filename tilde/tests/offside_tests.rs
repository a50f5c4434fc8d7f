mod common;
use common::*;

#[test]
fn blank_lines_inside_blocks_keep_the_block_open() {
    let source = "\
int x = 0
while x < 2

\tx += 1

\twrite(x)
write(\"done\")
";
    assert_eq!(run(source), "1 \n2 \ndone \n");
}

#[test]
fn comment_lines_at_any_indent_are_ignored() {
    let source = "\
~ leading comment
int x = 1
if x == 1
~ comment at column zero inside the block
\t\t~ over-indented comment
\twrite(\"in\")
~~ block comment
spanning lines ~~
write(\"out\") ~ trailing
";
    assert_eq!(run(source), "in \nout \n");
}

#[test]
fn program_may_end_inside_nested_blocks() {
    let source = "int x = 3\nwhile x > 0\n\tx -= 1\n\tif x == 0\n\t\twrite(\"zero\")";
    assert_eq!(run(source), "zero \n");
}

#[test]
fn dedent_across_several_levels() {
    let source = "\
for int i = 0; i < 2; i += 1
\tfor int j = 0; j < 2; j += 1
\t\tif i == j
\t\t\twrite(i, j)
write(\"end\")
";
    assert_eq!(run(source), "0 0 \n1 1 \nend \n");
}

#[test]
fn else_must_follow_the_if_block_directly() {
    let source = "\
if false
\twrite(1)
else
\twrite(2)
";
    assert_eq!(run(source), "2 \n");

    // blank lines are not tokens, so the else still follows the block
    assert_eq!(run("if false\n\twrite(1)\n\nelse\n\twrite(2)"), "2 \n");

    let (err, _) = run_err("if false\n\twrite(1)\nwrite(0)\nelse\n\twrite(2)");
    assert!(matches!(err, Error::Parse(_)), "got: {err}");
}

#[test]
fn line_continuation_joins_lines() {
    let source = "int total = 1 + \\\n2 + \\ ~ note\n3\nwrite(total)";
    assert_eq!(run(source), "6 \n");
}

#[test]
fn carriage_returns_are_whitespace() {
    let source = "int x = 1\r\nif x == 1\r\n\twrite(x)\r\n";
    assert_eq!(run(source), "1 \n");
}

#[test]
fn missing_indent_after_header_is_a_parse_error() {
    let (err, _) = run_err("while true\nstop");
    assert_eq!(
        err.to_string(),
        "Parser-> Error at line: 2, expected block start instead of 'stop'"
    );
}

#[test]
fn unexpected_indent_is_a_parse_error() {
    let (err, _) = run_err("int x = 1\n\twrite(x)");
    assert!(matches!(err, Error::Parse(_)), "got: {err}");
}

#[test]
fn lexer_errors_report_their_line() {
    let (err, _) = run_err("int x = 1\nstring s = \"open\nwrite(s)");
    assert_eq!(err.line(), 2);
    let (err, _) = run_err("int x = 1 \\ 2");
    assert_eq!(
        err.to_string(),
        "Lexer-> Error at line: 1, nothing must come after '\\'"
    );
    let (err, _) = run_err("~~ never closed\nint x = 1");
    assert!(matches!(err, Error::Lex(_)));
}
