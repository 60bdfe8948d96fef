use ifjc::error::{ErrorCode, Outcome};

fn compile_bytes(source: &[u8]) -> (Outcome, String) {
    let mut output = Vec::new();
    let outcome = ifjc::compile(source, "test.ifj", &mut output);

    (outcome, String::from_utf8(output).unwrap())
}

fn compile(source: &str) -> (Outcome, String) {
    compile_bytes(source.as_bytes())
}

fn program(body: &str) -> String {
    format!("import \"ifj25\" for Ifj\nclass Program {{\n{}\n}}\n", body)
}

fn main_with(statements: &str) -> String {
    program(&format!("static main() {{\n{}\n}}", statements))
}

fn code_of(source: &str) -> ErrorCode {
    compile(source).0.code
}

#[test]
fn minimal_program() {
    let (outcome, output) = compile(&main_with("return null"));

    assert_eq!(outcome.code, ErrorCode::Success);
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(
        output,
        "\
.IFJcode25
CREATEFRAME
PUSHFRAME
JUMP $$main
LABEL $main_0
CREATEFRAME
PUSHFRAME
PUSHS nil@nil
POPFRAME
RETURN
PUSHS nil@nil
POPFRAME
RETURN
LABEL $$main
CALL $main_0
EXIT int@0
"
    );
}

#[test]
fn single_line_body() {
    let (outcome, output) = compile(&program("static main() { return null }"));

    assert_eq!(outcome.code, ErrorCode::Success);
    assert!(output.ends_with("CALL $main_0\nEXIT int@0\n"));
}

#[test]
fn comments_are_ignored() {
    let source = "\
// header
import \"ifj25\" for Ifj
/* block /* nested */ */
class Program {
static main() { // entry
return null
}
}
";

    assert_eq!(code_of(source), ErrorCode::Success);
}

#[test]
fn redefinition_by_arity() {
    let twice = program("static f() {\n}\nstatic f() {\n}\nstatic main() {\n}");
    assert_eq!(code_of(&twice), ErrorCode::Redefinition);

    let overloaded = program("static f() {\n}\nstatic f(x) {\n}\nstatic main() {\n}");
    assert_eq!(code_of(&overloaded), ErrorCode::Success);
}

#[test]
fn variable_redefinition() {
    assert_eq!(code_of(&main_with("var a\nvar a")), ErrorCode::Redefinition);

    let shadowed_param = program("static f(a) {\nvar a\n}\nstatic main() {\n}");
    assert_eq!(code_of(&shadowed_param), ErrorCode::Redefinition);
}

#[test]
fn undefined_assignment_target() {
    let (outcome, output) = compile(&main_with("x = 1"));

    assert_eq!(outcome.code, ErrorCode::Undefined);
    assert_eq!(outcome.code.value(), 3);
    assert!(!output.contains("EXIT"));

    let report = outcome.diagnostics.to_string();
    assert!(report.starts_with("undefined symbol [3]: Undefined variable `x`\n --> test.ifj:4:1\n"));
    assert!(report.ends_with("Build failed with 1 error\n"));
}

#[test]
fn locals_do_not_leak_between_callables() {
    let source = program("static f() {\nvar a\n}\nstatic main() {\na = 1\n}");
    assert_eq!(code_of(&source), ErrorCode::Undefined);
}

#[test]
fn multiplication_binds_tighter() {
    let (outcome, output) = compile(&main_with("var a\na = 2 + 3 * 4"));

    assert_eq!(outcome.code, ErrorCode::Success);
    assert!(output.contains(
        "DEFVAR LF@a\nMOVE LF@a nil@nil\nPUSHS int@2\nPUSHS int@3\nPUSHS int@4\nMULS\nADDS\nPOPS LF@a\n"
    ));
}

#[test]
fn parentheses_override_precedence() {
    let (_, output) = compile(&main_with("var a\na = (2 + 3) * 4"));
    assert!(output.contains("PUSHS int@2\nPUSHS int@3\nADDS\nPUSHS int@4\nMULS\n"));
}

#[test]
fn control_flow_labels() {
    let body = "\
var a
a = 1
if (a < 2) {
a = 3
} else {
a = 4
}
while (a > 0) {
a = a - 1
}";

    let (outcome, output) = compile(&main_with(body));
    assert_eq!(outcome.code, ErrorCode::Success);

    assert!(output.contains("PUSHS LF@a\nPUSHS int@2\nLTS\nPUSHS bool@false\nJUMPIFEQS label_0\n"));
    assert!(output.contains("POPS LF@a\nJUMP label_1\nLABEL label_0\nPUSHS int@4\n"));
    assert!(output.contains("POPS LF@a\nLABEL label_1\nLABEL label_2\n"));

    assert!(output.contains(
        "\
LABEL label_2
PUSHS LF@a
PUSHS int@0
POPS GF@%temp_0
POPS GF@%temp_1
PUSHS GF@%temp_0
PUSHS GF@%temp_1
LTS
PUSHS bool@false
JUMPIFEQS label_3
"
    ));

    assert!(output.contains("SUBS\nPOPS LF@a\nJUMP label_2\nLABEL label_3\n"));
    assert!(output.ends_with("LABEL $$main\nDEFVAR GF@%temp_0\nDEFVAR GF@%temp_1\nCALL $main_0\nEXIT int@0\n"));
}

#[test]
fn else_is_required() {
    let body = "if (1 == 1) {\n}\nvar a";
    assert_eq!(code_of(&main_with(body)), ErrorCode::Syntax);
}

#[test]
fn comparison_operators() {
    let (_, output) = compile(&main_with("var a\na = 1 <= 2\na = 1 >= 2\na = 1 != 2"));

    assert!(output.contains("POPS GF@%temp_0\nPOPS GF@%temp_1\nPUSHS GF@%temp_0\nPUSHS GF@%temp_1\nLTS\nNOTS\n"));
    assert!(output.contains("PUSHS int@1\nPUSHS int@2\nLTS\nNOTS\nPOPS LF@a\n"));
    assert!(output.contains("PUSHS int@1\nPUSHS int@2\nEQS\nNOTS\nPOPS LF@a\n"));
}

#[test]
fn type_test() {
    let (outcome, output) = compile(&main_with("var a\na = 1 is Num"));

    assert_eq!(outcome.code, ErrorCode::Success);
    assert!(output.contains(
        "\
PUSHS int@1
POPS GF@%temp_0
TYPE GF@%temp_1 GF@%temp_0
PUSHS GF@%temp_1
PUSHS string@int
EQS
PUSHS GF@%temp_1
PUSHS string@float
EQS
ORS
POPS LF@a
"
    ));
}

#[test]
fn globals_are_defined_before_main() {
    let (outcome, output) = compile(&main_with("__g = 5\n__a = __g"));

    assert_eq!(outcome.code, ErrorCode::Success);
    assert!(output.contains("PUSHS int@5\nPOPS GF@__g\nPUSHS GF@__g\nPOPS GF@__a\n"));
    assert!(output.contains(
        "LABEL $$main\nDEFVAR GF@__a\nMOVE GF@__a nil@nil\nDEFVAR GF@__g\nMOVE GF@__g nil@nil\nCALL $main_0\n"
    ));
}

#[test]
fn functions_and_parameters() {
    let source = program(
        "\
static add(a, b) {
return a + b
}
static main() {
var r
r = add(1, 2)
}",
    );

    let (outcome, output) = compile(&source);
    assert_eq!(outcome.code, ErrorCode::Success);

    assert!(output.contains(
        "LABEL $add_2\nCREATEFRAME\nPUSHFRAME\nDEFVAR LF@b\nPOPS LF@b\nDEFVAR LF@a\nPOPS LF@a\n"
    ));

    assert!(output.contains("PUSHS LF@a\nPUSHS LF@b\nADDS\nPOPFRAME\nRETURN\n"));
    assert!(output.contains("PUSHS int@1\nPUSHS int@2\nCALL $add_2\nPOPS LF@r\n"));
}

#[test]
fn call_arity_mismatch_is_undefined() {
    let source = program("static f(x) {\n}\nstatic main() {\nvar r\nr = f()\n}");
    assert_eq!(code_of(&source), ErrorCode::Undefined);
}

#[test]
fn recursion() {
    let source = program("static f(n) {\nreturn f(n)\n}\nstatic main() {\n}");
    assert_eq!(code_of(&source), ErrorCode::Success);
}

#[test]
fn getters_and_setters() {
    let source = program(
        "\
static value {
return __store
}
static value = (v) {
__store = v
}
static main() {
var a
a = value
value = 3
}",
    );

    let (outcome, output) = compile(&source);
    assert_eq!(outcome.code, ErrorCode::Success);

    assert!(output.contains("LABEL $value_0\n"));
    assert!(output.contains("LABEL $value_1\nCREATEFRAME\nPUSHFRAME\nDEFVAR LF@v\nPOPS LF@v\nPUSHS LF@v\nPOPS GF@__store\n"));
    assert!(output.contains("CALL $value_0\nPOPS LF@a\n"));
    assert!(output.contains("PUSHS int@3\nCALL $value_1\nPOPS GF@%temp_0\n"));
}

#[test]
fn bare_calls() {
    let source = program("static f() {\n}\nstatic main() {\nf()\n}");
    assert_eq!(code_of(&source), ErrorCode::Other);
    assert_eq!(code_of(&main_with("Ifj.write(1)")), ErrorCode::Other);
}

#[test]
fn builtins() {
    let (outcome, output) = compile(&main_with("var a\na = Ifj.length(\"abc\")"));
    assert_eq!(outcome.code, ErrorCode::Success);
    assert!(output.contains("PUSHS string@abc\n# CALL Ifj.length\nPOPS LF@a\n"));

    assert_eq!(code_of(&main_with("var a\na = Ifj.write(1, 2)")), ErrorCode::ArgumentCount);
    assert_eq!(code_of(&main_with("var a\na = Ifj.nope()")), ErrorCode::Undefined);
}

#[test]
fn static_type_errors() {
    assert_eq!(code_of(&main_with("var a\na = \"s\" + 1")), ErrorCode::TypeCompatibility);
    assert_eq!(code_of(&main_with("var a\na = null - 1")), ErrorCode::TypeCompatibility);
    assert_eq!(code_of(&main_with("var a\na = \"ab\" * 3")), ErrorCode::Success);
    assert_eq!(code_of(&main_with("var a\nvar b\na = b + 1")), ErrorCode::Success);
}

#[test]
fn literal_encoding() {
    let (_, output) = compile(&main_with("var a\na = 1.5\na = 0x10\na = \"a b#\""));

    assert!(output.contains("PUSHS float@0x1.8p+0\n"));
    assert!(output.contains("PUSHS int@16\n"));
    assert!(output.contains("PUSHS string@a\\032b\\035\n"));
}

#[test]
fn hex_escapes_emit_single_bytes() {
    let (outcome, output) = compile(&main_with("var a\na = \"\\xff\\x41é\""));

    assert_eq!(outcome.code, ErrorCode::Success);
    assert!(output.contains("PUSHS string@\\255A\\195\\169\n"));
}

#[test]
fn invalid_encoding_is_lexical() {
    let mut source = main_with("var a\na = \"x\"").into_bytes();
    let x = source.iter().rposition(|&byte| byte == b'x').unwrap();
    source[x] = 0xFF;

    let (outcome, output) = compile_bytes(&source);
    assert_eq!(outcome.code, ErrorCode::Lexical);
    assert!(!output.contains("EXIT"));
    assert!(outcome.diagnostics.to_string().contains("Byte 0xFF is not valid UTF-8"));
}

#[test]
fn lexical_errors() {
    let (outcome, output) = compile(&main_with("var a @"));

    assert_eq!(outcome.code, ErrorCode::Lexical);
    assert!(!output.contains("EXIT"));

    assert_eq!(code_of(&main_with("var a\na = 99999999999999999999")), ErrorCode::Lexical);
}

#[test]
fn first_error_wins() {
    let (outcome, _) = compile(&main_with("var a\na = 1 @ 2"));

    assert_eq!(outcome.code, ErrorCode::Lexical);
    assert!(outcome.diagnostics.len() >= 2);
}

#[test]
fn missing_main() {
    let source = program("static f() {\n}");
    assert_eq!(code_of(&source), ErrorCode::Undefined);

    let getter = program("static main {\n}");
    assert_eq!(code_of(&getter), ErrorCode::Undefined);
}

#[test]
fn prolog_and_class_are_checked() {
    let wrong_module = "import \"other\" for Ifj\nclass Program {\nstatic main() {\n}\n}\n";
    assert_eq!(code_of(wrong_module), ErrorCode::Syntax);

    let wrong_class = "import \"ifj25\" for Ifj\nclass Main {\nstatic main() {\n}\n}\n";
    assert_eq!(code_of(wrong_class), ErrorCode::Syntax);

    let trailing = format!("{}static", main_with(""));
    assert_eq!(code_of(&trailing), ErrorCode::Syntax);
}

#[test]
fn global_named_like_a_callable_key() {
    let source = program("static _() {\n}\nstatic main() {\n__0 = 1\n}");
    let (outcome, output) = compile(&source);

    assert_eq!(outcome.code, ErrorCode::Success);
    assert!(output.contains("LABEL $__0\n"));
    assert!(output.contains("LABEL $$main\nDEFVAR GF@__0\nMOVE GF@__0 nil@nil\n"));
}

#[test]
fn deep_nesting_is_reported() {
    let nested = |depth: usize| format!("var a\na = {}1{}", "(".repeat(depth), ")".repeat(depth));

    let (outcome, output) = compile(&main_with(&nested(20_000)));
    assert_eq!(outcome.code, ErrorCode::Internal);
    assert!(!output.contains("EXIT"));

    assert_eq!(code_of(&main_with(&nested(50))), ErrorCode::Success);
}
