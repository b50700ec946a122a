use crate::opcode::Opcode;

/// Comparison operators recognised in `if`/`while` lines, in scan order.
/// A later entry found anywhere in the line overrides an earlier one, so
/// `>=` wins over `>` and `<=` over `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareOp {
    pub token: &'static str,
    pub if_opcode: Opcode,
    pub while_opcode: Opcode,
}

pub const COMPARE_OPS: [CompareOp; 6] = [
    CompareOp { token: "==", if_opcode: Opcode::IfEqual, while_opcode: Opcode::WEqual },
    CompareOp { token: ">", if_opcode: Opcode::IfGreater, while_opcode: Opcode::WGreater },
    CompareOp { token: ">=", if_opcode: Opcode::IfGreaterOrEqual, while_opcode: Opcode::WGreaterOrEqual },
    CompareOp { token: "<", if_opcode: Opcode::IfLower, while_opcode: Opcode::WLower },
    CompareOp { token: "<=", if_opcode: Opcode::IfLowerOrEqual, while_opcode: Opcode::WLowerOrEqual },
    CompareOp { token: "!=", if_opcode: Opcode::IfNotEqual, while_opcode: Opcode::WNotEqual },
];

/// Assignment operators, same override rule as `COMPARE_OPS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignOp {
    pub token: &'static str,
    pub opcode: Opcode,
}

pub const ASSIGN_OPS: [AssignOp; 13] = [
    AssignOp { token: "=", opcode: Opcode::Equal },
    AssignOp { token: "+=", opcode: Opcode::Add },
    AssignOp { token: "-=", opcode: Opcode::Sub },
    AssignOp { token: "++", opcode: Opcode::Inc },
    AssignOp { token: "--", opcode: Opcode::Dec },
    AssignOp { token: "*=", opcode: Opcode::Mul },
    AssignOp { token: "/=", opcode: Opcode::Div },
    AssignOp { token: ">>=", opcode: Opcode::ShR },
    AssignOp { token: "<<=", opcode: Opcode::ShL },
    AssignOp { token: "&=", opcode: Opcode::And },
    AssignOp { token: "|=", opcode: Opcode::Or },
    AssignOp { token: "^=", opcode: Opcode::Xor },
    AssignOp { token: "%=", opcode: Opcode::Mod },
];

pub const KW_IF: &str = "if";
pub const KW_WHILE: &str = "while";
pub const KW_SWITCH: &str = "switch";
pub const KW_CASE: &str = "case";
pub const KW_DEFAULT: &str = "default";
pub const KW_ENDSWITCH: &str = "endswitch";
pub const KW_ENDSUB: &str = "endsub";
pub const KW_ENDFUNCTION: &str = "endfunction";
pub const KW_ENDPLATFORM: &str = "#endplatform";
