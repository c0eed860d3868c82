//! # Parser 测试

use std::collections::BTreeSet;

use super::*;
use super::cursor::MAX_NESTING_DEPTH;
use crate::script::ast::{
    FunctionDeclaration, FunctionFlag, GenericCommand, LetOperator, ScriptUnit,
};
use crate::script::expr::{Expr, FunctionName, Scope};

fn parse(text: &str) -> Result<Script, ParseError> {
    Parser::new().parse("test.vim", text)
}

/// 解析只包含一个函数声明的脚本
fn single_function(text: &str) -> FunctionDeclaration {
    let script = parse(text).unwrap();
    assert_eq!(script.units.len(), 1, "应只有一个单元: {:?}", script.units);
    match script.units.into_iter().next() {
        Some(ScriptUnit::FunctionDeclaration(f)) => f,
        other => panic!("期望函数声明，实际为 {other:?}"),
    }
}

fn flags(list: &[FunctionFlag]) -> BTreeSet<FunctionFlag> {
    list.iter().copied().collect()
}

// -------------------------------------------------------------------------
// 基本场景
// -------------------------------------------------------------------------

#[test]
fn test_simple_function() {
    let f = single_function("function helloWorld()\necho 'hello world'\nendfunction");
    assert_eq!(f.name, "helloWorld");
    assert_eq!(f.scope, None);
    assert!(f.args.is_empty());
    assert!(f.flags.is_empty());
    assert!(!f.replace_existing);
    assert_eq!(f.body.len(), 1);
    assert!(matches!(
        &f.body[0],
        ScriptUnit::Echo(echo) if echo.expressions == vec![Expr::string("hello world")]
    ));
}

#[test]
fn test_flags_on_following_line() {
    let f = single_function("fun F1()\nrange abort\nendf");
    assert_eq!(f.name, "F1");
    assert_eq!(f.flags, flags(&[FunctionFlag::Range, FunctionFlag::Abort]));
    assert!(f.body.is_empty());
}

#[test]
fn test_function_shape_snapshot() {
    let f = single_function("fun F1()\nrange abort\nendf");
    insta::assert_yaml_snapshot!(f, @r###"
    ---
    name: F1
    scope: ~
    args: []
    flags:
      - Range
      - Abort
    body: []
    replace_existing: false
    "###);
}

#[test]
fn test_script_local_function_with_arguments() {
    let f = single_function(
        "function! s:Initialize(cmd,args)\necho \"Command: \" . a:cmd\nreturn 'true'\nendfunction",
    );
    assert_eq!(f.name, "Initialize");
    assert_eq!(f.scope, Some(Scope::Script));
    assert_eq!(f.args, vec!["cmd".to_string(), "args".to_string()]);
    assert!(f.replace_existing);
    assert_eq!(f.body.len(), 2);
    assert!(matches!(&f.body[0], ScriptUnit::Echo(_)));
    assert!(matches!(
        &f.body[1],
        ScriptUnit::Return(r) if r.expression == Expr::string("true")
    ));

    let ScriptUnit::Echo(echo) = &f.body[0] else {
        unreachable!()
    };
    assert_eq!(
        echo.expressions,
        vec![Expr::concat(
            Expr::string("Command: "),
            Expr::var(Some(Scope::Argument), "cmd")
        )]
    );
}

#[test]
fn test_global_function() {
    let f = single_function("function g:Hello()\nendfunction");
    assert_eq!(f.scope, Some(Scope::Global));
    assert_eq!(f.name, "Hello");
}

#[test]
fn test_dictionary_function_name() {
    let f = single_function(
        "function! s:dict.something.Initialize()\nreturn 'true'\nendfunction",
    );
    assert_eq!(f.name, "s:dict.something.Initialize");
    assert_eq!(f.scope, Some(Scope::Script));
    assert_eq!(f.body.len(), 1);

    let f = single_function("function mydict.Len() dict\nreturn 1\nendfunction");
    assert_eq!(f.name, "mydict.Len");
    assert_eq!(f.scope, None);
    assert!(f.has_flag(FunctionFlag::Dict));
}

#[test]
fn test_unknown_flag_on_following_line() {
    let err = parse("fun F1()\nbadflag\nendf").unwrap_err();
    assert!(matches!(
        err,
        ParseError::UnknownFunctionFlag { line: 2, column: 1, ref flag } if flag == "badflag"
    ));
}

#[test]
fn test_unknown_flag_on_header_line() {
    let err = parse("function F() abort badflag\nendfunction").unwrap_err();
    assert!(matches!(
        err,
        ParseError::UnknownFunctionFlag { line: 1, column: 20, ref flag } if flag == "badflag"
    ));

    // 标志行中后面的词同样必须是标志
    let err = parse("function F()\nabort nosuch\nendfunction").unwrap_err();
    assert!(matches!(
        err,
        ParseError::UnknownFunctionFlag { line: 2, column: 7, ref flag } if flag == "nosuch"
    ));
}

#[test]
fn test_command_after_header_is_not_a_flag_line() {
    let f = single_function("function F()\nset nocompatible\nendfunction");
    assert!(f.flags.is_empty());
    assert_eq!(
        f.body,
        vec![ScriptUnit::Generic(GenericCommand {
            range: None,
            name: "set".to_string(),
            bang: false,
            args: "nocompatible".to_string(),
        })]
    );

    let f = single_function("function F()\necho 'x'\nendfunction");
    assert!(f.flags.is_empty());
    assert_eq!(f.body.len(), 1);
}

#[test]
fn test_ex_commands_after_header_are_body_lines() {
    let f = single_function("function! F()\nwincmd p\nendfunction");
    assert!(f.flags.is_empty());
    assert_eq!(
        f.body,
        vec![ScriptUnit::Generic(GenericCommand {
            range: None,
            name: "wincmd".to_string(),
            bang: false,
            args: "p".to_string(),
        })]
    );

    for command in ["stopinsert", "close", "winc p", "stopi", "tabnew"] {
        let text = format!("function! F()\n{command}\nendfunction");
        let f = single_function(&text);
        assert!(f.flags.is_empty(), "{command}");
        assert!(matches!(&f.body[..], [ScriptUnit::Generic(_)]), "{command}");
    }
}

#[test]
fn test_trailing_comments_on_function_lines() {
    let f = single_function("function! F() abort \" hdr\necho 1\nendfunction \" done");
    assert_eq!(f.flags, flags(&[FunctionFlag::Abort]));
    assert_eq!(f.body.len(), 1);

    let f = single_function("function! F() \" hdr\nabort dict \" flags\nendfunction");
    assert_eq!(f.flags, flags(&[FunctionFlag::Abort, FunctionFlag::Dict]));
    assert!(f.body.is_empty());
}

#[test]
fn test_flags_on_header_disable_flag_line() {
    // 函数头已有标志时，下一行按普通指令处理
    let f = single_function("function F() abort\nfoo\nendfunction");
    assert_eq!(f.flags, flags(&[FunctionFlag::Abort]));
    assert!(matches!(&f.body[0], ScriptUnit::Generic(g) if g.name == "foo"));
}

// -------------------------------------------------------------------------
// 语法性质
// -------------------------------------------------------------------------

#[test]
fn test_whitespace_invariance() {
    let expected = single_function(
        "function! s:Initialize(cmd,args)\necho \"Command: \" . a:cmd\nreturn 'true'\nendfunction",
    );
    let pieces = [
        "function",
        "!",
        "s:Initialize",
        "(",
        "cmd",
        ",",
        "args",
        ")",
        "\n",
        "echo",
        "\"Command: \"",
        ".",
        "a:cmd",
        "\n",
        "return",
        "'true'",
        "\n",
        "endfunction",
    ];
    // separators[i] 位于 pieces[i] 之前，最后一个位于行尾
    let build = |separators: &[String]| {
        let mut text = String::new();
        for (separator, piece) in separators.iter().zip(pieces.iter()) {
            text.push_str(separator);
            text.push_str(piece);
        }
        text.push_str(&separators[pieces.len()]);
        text
    };
    let line_starts: Vec<usize> = (1..pieces.len())
        .filter(|&i| pieces[i - 1] == "\n")
        .collect();

    for space in ["", " ", " \t "] {
        let mut variants = vec![vec![space.to_string(); pieces.len() + 1]];
        for at in 0..=pieces.len() {
            let mut separators = vec![String::new(); pieces.len() + 1];
            separators[at] = space.to_string();
            variants.push(separators);
        }
        // 只含空白的函数体行
        for &at in &line_starts {
            let mut separators = vec![space.to_string(); pieces.len() + 1];
            separators[at] = format!("{space}\n{space}");
            variants.push(separators);
        }

        for separators in &variants {
            let text = build(separators);
            assert_eq!(single_function(&text), expected, "{text:?}");
        }
    }

    // 续行
    let continued = single_function(concat!(
        "function! s:Initialize(cmd,\n    \\ args)\n",
        "echo \"Command: \"\n\\ . a:cmd\nreturn 'true'\nendfunction"
    ));
    assert_eq!(continued, expected);
}

#[test]
fn test_abbreviation_completeness() {
    let function = "function";
    let endfunction = "endfunction";
    for start in 2..=function.len() {
        for end in 4..=endfunction.len() {
            let text = format!(
                "{} F()\necho 'x'\n{}",
                &function[..start],
                &endfunction[..end]
            );
            let f = single_function(&text);
            assert_eq!(f.name, "F", "{text:?}");
            assert_eq!(f.body.len(), 1, "{text:?}");
        }
    }
}

#[test]
fn test_non_keywords_are_generic_commands() {
    let script = parse("f F()").unwrap();
    assert!(matches!(&script.units[0], ScriptUnit::Generic(g) if g.name == "f"));

    // "end" 不是 endfunction 的合法缩写，函数体没有结束
    let err = parse("function F()\necho 1\nend").unwrap_err();
    assert!(matches!(
        err,
        ParseError::UnterminatedFunction { line: 1, .. }
    ));
}

#[test]
fn test_flag_order_and_duplicates() {
    let expected = flags(&[
        FunctionFlag::Range,
        FunctionFlag::Abort,
        FunctionFlag::Dict,
        FunctionFlag::Closure,
    ]);
    for list in [
        "range abort dict closure",
        "closure dict abort range",
        "abort closure range dict",
        "dict dict range abort closure abort",
    ] {
        let same_line = single_function(&format!("function a.F() {list}\nendfunction"));
        assert_eq!(same_line.flags, expected, "{list}");
        let next_line = single_function(&format!("function a.F()\n{list}\nendfunction"));
        assert_eq!(next_line.flags, expected, "{list}");
    }
}

#[test]
fn test_comment_and_blank_lines_are_transparent() {
    let plain = "function! s:F(a)\necho a:a\nreturn 'x'\nendfunction\necho 'done'";
    let noisy = concat!(
        "\" header\n\nfunction! s:F(a)\n  \" inside\n\necho a:a\n\n\"\n",
        "return 'x'\n\" before end\nendfunction\n\n\n\" tail\necho 'done'\n"
    );
    assert_eq!(parse(plain).unwrap().units, parse(noisy).unwrap().units);
}

#[test]
fn test_source_map_tracks_start_lines() {
    let script = parse("\" comment\necho 'a'\n\nfunction F()\nendfunction\nset nu").unwrap();
    assert_eq!(script.source_map, vec![2, 4, 6]);
    assert_eq!(script.line_of(1), Some(4));
}

#[test]
fn test_nested_function() {
    let f = single_function(concat!(
        "function Outer()\nfunction! Inner() closure\nreturn 1\nendfunction\n",
        "return Inner()\nendfunction"
    ));
    assert_eq!(f.body.len(), 2);
    let ScriptUnit::FunctionDeclaration(inner) = &f.body[0] else {
        panic!("期望嵌套函数声明");
    };
    assert_eq!(inner.name, "Inner");
    assert!(inner.has_flag(FunctionFlag::Closure));
    assert!(inner.replace_existing);
}

// -------------------------------------------------------------------------
// 其他指令
// -------------------------------------------------------------------------

#[test]
fn test_let_and_unlet() {
    let script = parse("let g:x = 'a'\nlet s:y .= g:x . 1\nunlet! g:x s:y").unwrap();
    let ScriptUnit::Let(first) = &script.units[0] else {
        panic!("期望 let");
    };
    assert_eq!(first.target.scope, Some(Scope::Global));
    assert_eq!(first.operator, LetOperator::Assign);

    let ScriptUnit::Let(second) = &script.units[1] else {
        panic!("期望 let");
    };
    assert_eq!(second.operator, LetOperator::Append);
    assert_eq!(
        second.value,
        Expr::concat(Expr::var(Some(Scope::Global), "x"), Expr::number(1))
    );

    let ScriptUnit::Unlet(unlet) = &script.units[2] else {
        panic!("期望 unlet");
    };
    assert!(unlet.bang);
    assert_eq!(unlet.targets.len(), 2);
}

#[test]
fn test_call_and_delfunction() {
    let script = parse("call s:Init('x', 2)\n%call Fix()\ndelf! s:dict.Init").unwrap();
    let ScriptUnit::Call(call) = &script.units[0] else {
        panic!("期望 call");
    };
    assert_eq!(
        call.call.name,
        FunctionName::new(Some(Scope::Script), "Init")
    );
    assert_eq!(call.call.args.len(), 2);
    assert_eq!(call.range, None);

    let ScriptUnit::Call(ranged) = &script.units[1] else {
        panic!("期望 call");
    };
    assert_eq!(ranged.range.as_deref(), Some("%"));

    let ScriptUnit::DelFunction(del) = &script.units[2] else {
        panic!("期望 delfunction");
    };
    assert!(del.bang);
    assert_eq!(del.name.name, "s:dict.Init");
}

#[test]
fn test_generic_commands() {
    let script = parse("set nocompatible\n:'<,'>normal! gv\n:5\n!ls").unwrap();
    let generics: Vec<&GenericCommand> = script
        .units
        .iter()
        .map(|unit| match unit {
            ScriptUnit::Generic(g) => g,
            other => panic!("期望普通指令，实际为 {other:?}"),
        })
        .collect();

    assert_eq!(generics[0].name, "set");
    assert_eq!(generics[0].args, "nocompatible");
    assert_eq!(generics[1].range.as_deref(), Some("'<,'>"));
    assert!(generics[1].bang);
    assert_eq!(generics[1].args, "gv");
    assert_eq!(generics[2].range.as_deref(), Some("5"));
    assert_eq!(generics[2].name, "");
    assert_eq!(generics[3].name, "!");
    assert_eq!(generics[3].args, "ls");
}

// -------------------------------------------------------------------------
// 错误
// -------------------------------------------------------------------------

#[test]
fn test_return_without_expression() {
    let err = parse("function F()\nreturn\nendfunction").unwrap_err();
    assert!(matches!(
        err,
        ParseError::ReturnWithoutExpression { line: 2 }
    ));
}

#[test]
fn test_unterminated_function() {
    let err = parse("echo 'a'\nfunction! s:F()\necho 'b'").unwrap_err();
    assert!(matches!(
        err,
        ParseError::UnterminatedFunction { line: 2, ref name } if name == "s:F"
    ));
}

#[test]
fn test_unexpected_endfunction() {
    let err = parse("echo 'a'\nendfunction").unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedEndFunction { line: 2 }));
}

#[test]
fn test_invalid_function_names() {
    assert!(matches!(
        parse("function a:F()\nendfunction"),
        Err(ParseError::InvalidFunctionName { line: 1, .. })
    ));
    assert!(matches!(
        parse("function ()\nendfunction"),
        Err(ParseError::InvalidFunctionName { line: 1, .. })
    ));
    assert!(matches!(
        parse("function F\nendfunction"),
        Err(ParseError::ExpectedToken { line: 1, .. })
    ));
}

#[test]
fn test_statement_errors() {
    assert!(matches!(
        parse("echo"),
        Err(ParseError::MissingArgument { line: 1, .. })
    ));
    assert!(matches!(
        parse("let x"),
        Err(ParseError::ExpectedToken { line: 1, .. })
    ));
    assert!(matches!(
        parse("call F() extra"),
        Err(ParseError::TrailingCharacters { line: 1, .. })
    ));
    assert!(matches!(
        parse("1,3echo 'x'"),
        Err(ParseError::RangeNotAllowed { line: 1, .. })
    ));
    assert!(matches!(
        parse("echo 'unterminated"),
        Err(ParseError::Lex(_))
    ));
}

#[test]
fn test_deeply_nested_functions_are_rejected() {
    let depth = MAX_NESTING_DEPTH + 100;
    let text = "function F()\n".repeat(depth) + &"endfunction\n".repeat(depth);
    let err = parse(&text).unwrap_err();
    assert!(matches!(err, ParseError::NestingTooDeep { .. }), "{err:?}");
    assert_eq!(err.line(), MAX_NESTING_DEPTH + 1);

    let mut parser = Parser::new();
    let script = parser.parse_lenient("test.vim", &format!("{text}echo 'after'"));
    assert_eq!(parser.errors().len(), 1);
    assert!(matches!(&script.units[..], [ScriptUnit::Echo(_)]));

    let text = "function F()\n".repeat(50) + &"endfunction\n".repeat(50);
    assert!(parse(&text).is_ok());
}

#[test]
fn test_error_reports_first_failure_only() {
    let err = parse("echo 'ok'\necho ,\necho 'never'").unwrap_err();
    assert_eq!(err.line(), 2);
}

// -------------------------------------------------------------------------
// 宽松模式
// -------------------------------------------------------------------------

#[test]
fn test_lenient_skips_failing_units() {
    let mut parser = Parser::new();
    let script = parser.parse_lenient(
        "test.vim",
        "echo 'first'\necho ,\nfunction F()\nbadflag\necho 'in F'\nendfunction\necho 'last'",
    );

    assert_eq!(parser.errors().len(), 2);
    assert_eq!(parser.errors()[0].line(), 2);
    assert!(matches!(
        parser.errors()[1],
        ParseError::UnknownFunctionFlag { line: 4, .. }
    ));

    assert_eq!(script.units.len(), 2);
    assert_eq!(script.source_map, vec![1, 7]);
}

#[test]
fn test_lenient_skips_nested_function_through_its_end() {
    let mut parser = Parser::new();
    let script = parser.parse_lenient(
        "test.vim",
        "function Outer()\nfunction Inner()\nreturn\nendfunction\nendfunction\necho 'after'",
    );
    assert_eq!(parser.errors().len(), 1);
    assert_eq!(script.units.len(), 1);
    assert!(matches!(&script.units[0], ScriptUnit::Echo(_)));
}

#[test]
fn test_lenient_matches_strict_on_valid_input() {
    let text = "let g:a = 1\nfunction F(x)\nreturn a:x\nendfunction\ncall F(1)";
    let mut parser = Parser::new();
    let lenient = parser.parse_lenient("test.vim", text);
    assert!(parser.errors().is_empty());
    assert_eq!(lenient, parse(text).unwrap());
}
