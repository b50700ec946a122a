use std::sync::OnceLock;

use regex::Regex;

use crate::token::{ASSIGN_OPS, COMPARE_OPS, KW_CASE, KW_DEFAULT, KW_IF, KW_SWITCH, KW_WHILE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    If,
    While,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub kind: ConditionKind,
    pub text: String,
}

/// One call argument: the base name and the text between `[` and `]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operand {
    pub base: String,
    pub index: Option<String>,
}

impl Operand {
    fn finish(mut self) -> Self {
        if self.index.as_deref() == Some("") {
            self.index = None;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call<'a> {
    pub name: &'a str,
    pub args: Vec<Operand>,
}

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn alias_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"^#alias([^:]+):(.+)$")
}

fn platform_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"^#platform:(.*)$")
}

fn function_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"^(#?)function(.+)$")
}

/// First byte offset of `token` in `text`, skipping quoted strings.
pub fn find_token(text: &str, token: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let needle = token.as_bytes();
    let mut in_string = false;
    for i in 0..bytes.len() {
        if bytes[i] == b'"' {
            in_string = !in_string;
            continue;
        }
        if !in_string && bytes[i..].starts_with(needle) {
            return Some(i);
        }
    }
    None
}

/// `ifA==B` becomes `IfEqual(slot,A,B)`, `whileA<B` becomes
/// `WLower(slot,A,B)`. Lines without a comparison are left alone.
pub fn rewrite_condition(text: &str, slot: i32) -> Option<Condition> {
    let (kind, skip) = if text.starts_with(KW_IF) {
        (ConditionKind::If, KW_IF.len())
    } else if text.starts_with(KW_WHILE) {
        (ConditionKind::While, KW_WHILE.len())
    } else {
        return None;
    };

    let mut matched = None;
    for op in COMPARE_OPS.iter() {
        if let Some(pos) = find_token(text, op.token) {
            matched = Some((op, pos));
        }
    }
    let (op, pos) = matched?;

    let name = match kind {
        ConditionKind::If => op.if_opcode.name(),
        ConditionKind::While => op.while_opcode.name(),
    };
    let mut out = format!("{}({},", name, slot);
    for (i, ch) in text.char_indices().skip_while(|(i, _)| *i < skip) {
        if i == pos {
            out.push(',');
        } else if !matches!(ch, '=' | '(' | ')') {
            out.push(ch);
        }
    }
    out.push(')');
    Some(Condition { kind, text: out })
}

/// `switchExpr` becomes `switch(slot,Expr)`.
pub fn rewrite_switch(text: &str, slot: i32) -> Option<String> {
    let rest = text.strip_prefix(KW_SWITCH)?;
    let expr: String = rest.chars().filter(|c| !matches!(c, '=' | '(' | ')')).collect();
    Some(format!("switch({},{})", slot, expr))
}

/// Rewrites infix assignment into call form, `A+=B` to `Add(A,B)`.
pub fn rewrite_assignment(text: &str) -> Option<String> {
    let mut matched = None;
    for op in ASSIGN_OPS.iter() {
        if let Some(pos) = find_token(text, op.token) {
            matched = Some((op, pos));
        }
    }
    let (op, pos) = matched?;

    let mut out = format!("{}({}", op.opcode.name(), &text[..pos]);
    if op.opcode.arity() > 1 {
        out.push(',');
        out.push_str(&text[pos + op.token.len()..]);
    }
    out.push(')');
    Some(out)
}

/// The raw label of a `caseX:` line.
pub fn case_label(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(KW_CASE)?;
    Some(rest.split(':').next().unwrap_or(rest))
}

pub fn is_default_label(text: &str) -> bool {
    text.starts_with(KW_DEFAULT)
}

pub fn starts_switch(text: &str) -> bool {
    text.starts_with(KW_SWITCH)
}

/// `#aliasNAME:VALUE`.
pub fn alias_directive(text: &str) -> Option<(&str, &str)> {
    let caps = alias_regex()?.captures(text)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Tags listed by a `#platform:` line.
pub fn platform_directive(text: &str) -> Option<Vec<&str>> {
    let caps = platform_regex()?.captures(text)?;
    Some(
        caps.get(1)?
            .as_str()
            .split(',')
            .filter(|tag| !tag.is_empty())
            .collect(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionDirective<'a> {
    Declare(&'a str),
    Define(&'a str),
}

/// `#functionName` pre-registers a name, `functionName` opens a body.
pub fn function_directive(text: &str) -> Option<FunctionDirective<'_>> {
    let caps = function_regex()?.captures(text)?;
    let name = caps.get(2)?.as_str();
    if caps.get(1).map_or(false, |m| !m.as_str().is_empty()) {
        Some(FunctionDirective::Declare(name))
    } else {
        Some(FunctionDirective::Define(name))
    }
}

/// Decimal or `0x` hexadecimal with an optional sign. Overflow wraps.
pub fn parse_integer(text: &str) -> Option<i32> {
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (radix, digits) = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => (16, hex),
        None => (10, digits),
    };
    if digits.is_empty() {
        return None;
    }

    let mut value: i32 = 0;
    for ch in digits.chars() {
        let digit = ch.to_digit(radix)? as i32;
        value = value.wrapping_mul(radix as i32).wrapping_add(digit);
    }
    Some(if negative { value.wrapping_neg() } else { value })
}

/// Splits `Name[index]rest` into base `Namerest` and the index text.
pub fn split_indexed(text: &str) -> Operand {
    let mut operand = Operand::default();
    let mut in_index = false;
    for ch in text.chars() {
        match ch {
            '[' if !in_index => {
                in_index = true;
                operand.index.get_or_insert_with(String::new);
            }
            ']' if in_index => in_index = false,
            c if in_index => operand.index.get_or_insert_with(String::new).push(c),
            c => operand.base.push(c),
        }
    }
    operand.finish()
}

/// Splits a canonical call line into its name and arguments. Commas and
/// parentheses inside string literals do not split.
pub fn split_call(text: &str) -> Call<'_> {
    let Some(open) = text.find('(') else {
        return Call {
            name: text,
            args: Vec::new(),
        };
    };

    let mut args = Vec::new();
    let mut current = Operand::default();
    let mut in_index = false;
    let mut in_string = false;

    for ch in text[open + 1..].chars() {
        if in_string {
            current.base.push(ch);
            if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                current.base.push(ch);
            }
            ',' => {
                args.push(std::mem::take(&mut current).finish());
                in_index = false;
            }
            ')' => break,
            '[' => {
                in_index = true;
                current.index.get_or_insert_with(String::new);
            }
            ']' => in_index = false,
            c if in_index => current.index.get_or_insert_with(String::new).push(c),
            c => current.base.push(c),
        }
    }

    let current = current.finish();
    if !args.is_empty() || current != Operand::default() {
        args.push(current);
    }

    Call {
        name: &text[..open],
        args,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn if_rewrite_prefers_later_operators() {
        let cond = rewrite_condition("ifObject.Value0>=5", 3).unwrap();
        assert_eq!(cond.kind, ConditionKind::If);
        assert_eq!(cond.text, "IfGreaterOrEqual(3,Object.Value0,5)");

        let cond = rewrite_condition("ifTempValue0!=TempValue1", 0).unwrap();
        assert_eq!(cond.text, "IfNotEqual(0,TempValue0,TempValue1)");

        let cond = rewrite_condition("if(Object.State==2)", 7).unwrap();
        assert_eq!(cond.text, "IfEqual(7,Object.State,2)");
    }

    #[test]
    fn while_rewrite_uses_loop_opcodes() {
        let cond = rewrite_condition("whileTempValue0<=10", 12).unwrap();
        assert_eq!(cond.kind, ConditionKind::While);
        assert_eq!(cond.text, "WLowerOrEqual(12,TempValue0,10)");
        assert!(rewrite_condition("ifnothing", 0).is_none());
        assert!(rewrite_condition("Equal(a,b)", 0).is_none());
    }

    #[test]
    fn switch_rewrite_wraps_expression() {
        assert_eq!(
            rewrite_switch("switchObject.State", 4).as_deref(),
            Some("switch(4,Object.State)")
        );
        assert!(rewrite_switch("endswitch", 0).is_none());
    }

    #[test]
    fn assignment_rewrite_last_table_match_wins() {
        assert_eq!(rewrite_assignment("TempValue0-=1").as_deref(), Some("Sub(TempValue0,1)"));
        assert_eq!(rewrite_assignment("Object.XPos=-0x10000").as_deref(), Some("Equal(Object.XPos,-0x10000)"));
        assert_eq!(rewrite_assignment("TempValue1>>=2").as_deref(), Some("ShR(TempValue1,2)"));
        assert_eq!(rewrite_assignment("Object.Frame++").as_deref(), Some("Inc(Object.Frame)"));
        assert_eq!(rewrite_assignment("Object[-1].Value0--").as_deref(), Some("Dec(Object[-1].Value0)"));
        assert_eq!(rewrite_assignment("DrawSprite(0)"), None);
    }

    #[test]
    fn assignment_rewrite_ignores_strings() {
        assert_eq!(rewrite_assignment("LoadSpriteSheet(\"a=b.gif\")"), None);
    }

    #[test]
    fn integers_accept_sign_and_hex() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("-7"), Some(-7));
        assert_eq!(parse_integer("+7"), Some(7));
        assert_eq!(parse_integer("0x1F"), Some(31));
        assert_eq!(parse_integer("-0x10000"), Some(-0x10000));
        assert_eq!(parse_integer("0xFFFFFFFF"), Some(-1));
        assert_eq!(parse_integer(""), None);
        assert_eq!(parse_integer("-"), None);
        assert_eq!(parse_integer("0x"), None);
        assert_eq!(parse_integer("12a"), None);
        assert_eq!(parse_integer("Object.XPos"), None);
    }

    #[test]
    fn labels_and_directives() {
        assert_eq!(case_label("case-1:"), Some("-1"));
        assert_eq!(case_label("caseFACING_LEFT:"), Some("FACING_LEFT"));
        assert!(is_default_label("default:"));
        assert_eq!(alias_directive("#aliasSpeed:Object.Value1"), Some(("Speed", "Object.Value1")));
        assert_eq!(platform_directive("#platform:Mobile,HW_Rendering"), Some(vec!["Mobile", "HW_Rendering"]));
        assert_eq!(function_directive("#functionSpawnDebris"), Some(FunctionDirective::Declare("SpawnDebris")));
        assert_eq!(function_directive("functionSpawnDebris"), Some(FunctionDirective::Define("SpawnDebris")));
        assert_eq!(function_directive("endfunction"), None);
    }

    #[test]
    fn calls_split_into_operands() {
        let call = split_call("Equal(Object[+1].XPos,TempValue0)");
        assert_eq!(call.name, "Equal");
        assert_eq!(call.args.len(), 2);
        assert_eq!(call.args[0].base, "Object.XPos");
        assert_eq!(call.args[0].index.as_deref(), Some("+1"));
        assert_eq!(call.args[1].index, None);

        let call = split_call("LoadSpriteSheet(\"Global/a,b.gif\")");
        assert_eq!(call.args.len(), 1);
        assert_eq!(call.args[0].base, "\"Global/a,b.gif\"");

        assert!(split_call("ProcessAnimation()").args.is_empty());
        assert!(split_call("endif").args.is_empty());
        assert_eq!(split_call("endif").name, "endif");
    }

    #[test]
    fn indexed_alias_values_split() {
        let op = split_indexed("Object[ArrayPos0].Value2");
        assert_eq!(op.base, "Object.Value2");
        assert_eq!(op.index.as_deref(), Some("ArrayPos0"));
        assert_eq!(split_indexed("Object.Value2").index, None);
    }
}
