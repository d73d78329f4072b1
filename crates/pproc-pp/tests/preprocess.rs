//! Integration tests driving the public `Preprocessor` API.

use std::fs;
use std::rc::Rc;

use tempfile::TempDir;

use pproc_pp::Preprocessor;
use pproc_util::{ErrorList, Level};

/// Preprocesses `source` and renders the cooked stream with single
/// spaces between tokens, EOLs dropped.
fn cook(source: &str) -> (String, Rc<ErrorList>) {
    let errlist = Rc::new(ErrorList::new());
    let mut pp = Preprocessor::new(Rc::clone(&errlist));
    pp.open_source("test.c", source);
    (drain(&mut pp), errlist)
}

fn drain(pp: &mut Preprocessor) -> String {
    let mut parts = Vec::new();
    loop {
        let token = pp.next();
        if token.is_eof() {
            break;
        }
        if token.is_eol() {
            continue;
        }
        parts.push(token.to_string());
    }
    parts.join(" ")
}

#[test]
fn macro_chains_expand_fully() {
    let (out, errlist) = cook("#define C 3\n#define B C\n#define A B\nA\n");
    assert_eq!(out, "3");
    assert!(!errlist.has_errors());
}

#[test]
fn mutual_recursion_is_suppressed() {
    let (out, errlist) = cook("#define A B\n#define B A\nA B\n");
    assert_eq!(out, "A B");
    assert!(!errlist.has_errors());
}

#[test]
fn later_definition_wins_at_use_time() {
    // Replacement lists are expanded when used, not when defined.
    let (out, _) = cook("#define A B\n#define B 1\nA\n");
    assert_eq!(out, "1");
}

#[test]
fn parameter_shadows_macro_only_during_binding() {
    let source = "#define x GLOBAL\n#define ID(x) x\nID(local)\nx\n";
    let (out, errlist) = cook(source);
    assert_eq!(out, "local GLOBAL");
    assert!(!errlist.has_errors());
}

#[test]
fn argument_expansion_uses_current_definitions() {
    let source = "#define N 1\n#define ID(x) x\nID(N)\n#undef N\nID(N)\n";
    let (out, _) = cook(source);
    assert_eq!(out, "1 N");
}

#[test]
fn function_like_macro_in_argument() {
    let source = "#define TWICE(x) x x\n#define W(a) [a]\nTWICE(W(1))\n";
    let (out, errlist) = cook(source);
    assert_eq!(out, "[ 1 ] [ 1 ]");
    assert!(!errlist.has_errors());
}

#[test]
fn stringify_normalizes_inner_spacing() {
    let (out, _) = cook("#define STR(x) #x\nSTR( a  +  b )\n");
    assert_eq!(out, "\"a + b\"");
}

#[test]
fn stringify_escapes_string_arguments() {
    let (out, _) = cook("#define STR(x) #x\nSTR(\"hi\")\n");
    assert_eq!(out, "\"\\\"hi\\\"\"");
}

#[test]
fn stringify_of_empty_argument_is_empty_string() {
    let (out, errlist) = cook("#define STR(x) #x\nSTR()\n");
    assert_eq!(out, "\"\"");
    assert!(!errlist.has_errors());
}

#[test]
fn paste_builds_usable_macro_names() {
    let source = "#define value_one 1\n#define GET(n) value_##n\nGET(one)\n";
    let (out, errlist) = cook(source);
    // The pasted name rescans and expands.
    assert_eq!(out, "1");
    assert!(!errlist.has_errors());
}

#[test]
fn variadic_with_no_arguments_binds_empty() {
    let (out, errlist) = cook("#define P(...) [__VA_ARGS__]\nP()\n");
    assert_eq!(out, "[ ]");
    assert!(!errlist.has_errors());
}

#[test]
fn expansion_result_concatenates_with_literals() {
    let (out, _) = cook("#define S \"a\"\nS \"b\"\n");
    assert_eq!(out, "\"ab\"");
}

#[test]
fn define_spans_continuation_lines() {
    let (out, _) = cook("#define Y a\\\nb\nY\n");
    assert_eq!(out, "ab");
}

#[test]
fn block_comment_inside_directive_line() {
    let (out, errlist) = cook("#define X 1 /* two\nlines */ 2\nX\n");
    assert_eq!(out, "1 2");
    assert!(!errlist.has_errors());
}

#[test]
fn undef_then_redefine() {
    let (out, _) = cook("#define X 1\nX\n#undef X\nX\n#define X 2\nX\n");
    assert_eq!(out, "1 X 2");
}

#[test]
fn skipped_branches_preserve_balance_across_files() {
    let source = "\
#ifdef MISSING
#ifdef ALSO_MISSING
deep
#endif
never
#endif
after
";
    let (out, errlist) = cook(source);
    assert_eq!(out, "after");
    assert!(!errlist.has_errors());
}

#[test]
fn else_branch_of_taken_if_is_skipped() {
    let (out, _) = cook("#define A\n#ifdef A\nyes\n#else\nno\n#endif\n");
    assert_eq!(out, "yes");
}

#[test]
fn absolute_include_path() {
    let dir = TempDir::new().unwrap();
    let header = dir.path().join("abs.h");
    fs::write(&header, "absolute\n").unwrap();

    let errlist = Rc::new(ErrorList::new());
    let mut pp = Preprocessor::new(Rc::clone(&errlist));
    pp.open_source("test.c", &format!("#include \"{}\"\nrest\n", header.display()));

    assert_eq!(drain(&mut pp), "absolute rest");
    assert!(!errlist.has_errors());
}

#[test]
fn angled_include_uses_search_path() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sys.h"), "#define SYS 9\n").unwrap();

    let errlist = Rc::new(ErrorList::new());
    let mut pp = Preprocessor::new(Rc::clone(&errlist));
    pp.add_include_dir(dir.path().to_path_buf());
    pp.open_source("test.c", "#include <sys.h>\nSYS\n");

    assert_eq!(drain(&mut pp), "9");
    assert!(!errlist.has_errors());
}

#[test]
fn macros_defined_before_include_are_visible_inside() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("use.h"), "VALUE\n").unwrap();

    let errlist = Rc::new(ErrorList::new());
    let mut pp = Preprocessor::new(Rc::clone(&errlist));
    pp.add_include_dir(dir.path().to_path_buf());
    pp.open_source("test.c", "#define VALUE 5\n#include \"use.h\"\n");

    assert_eq!(drain(&mut pp), "5");
}

#[test]
fn conditional_guards_prevent_double_inclusion() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("guarded.h"),
        "#ifndef GUARD\n#define GUARD\nonce\n#endif\n",
    )
    .unwrap();

    let errlist = Rc::new(ErrorList::new());
    let mut pp = Preprocessor::new(Rc::clone(&errlist));
    pp.add_include_dir(dir.path().to_path_buf());
    pp.open_source(
        "test.c",
        "#include \"guarded.h\"\n#include \"guarded.h\"\ndone\n",
    );

    assert_eq!(drain(&mut pp), "once done");
    assert!(!errlist.has_errors());
}

#[test]
fn diagnostics_from_included_file_name_that_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.h"), "#error in header\n").unwrap();

    let errlist = Rc::new(ErrorList::new());
    let mut pp = Preprocessor::new(Rc::clone(&errlist));
    pp.add_include_dir(dir.path().to_path_buf());
    pp.open_source("test.c", "#include \"bad.h\"\n");
    drain(&mut pp);

    assert_eq!(errlist.count(Level::Error), 1);
    let diag = &errlist.diagnostics()[0];
    assert!(diag.filename.ends_with("bad.h"));
    assert_eq!(diag.location.line, 1);
}

#[test]
fn empty_input_produces_only_eof() {
    let (out, errlist) = cook("");
    assert_eq!(out, "");
    assert!(errlist.is_empty());
}

#[test]
fn noexpand_survives_passing_through_another_expansion() {
    // The suppressed inner name must stay suppressed when it is later
    // carried through a different macro's argument.
    let source = "#define f(x) f(x)\n#define ID(x) x\nID(f(1))\n";
    let (out, errlist) = cook(source);
    assert_eq!(out, "f ( 1 )");
    assert!(!errlist.has_errors());
}
