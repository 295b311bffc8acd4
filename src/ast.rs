//! Lamia syntax tree.
//!
//! The tree is strict: every node owns its children in source order. The only
//! cross-link is `defined_in`, a plain [`NodeId`] naming the enclosing manifest
//! or blueprint. Rendering to the individual targets lives in `render/`.

use serde::{Deserialize, Serialize};

use crate::validate::SourceLocation;

pub const DEFAULT_THEME: &str = "medusa-default";

// ═══════════════════════════════════════════════════════════════════════════════
// IDS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

/// Issues node ids for one parse call. Two parses of the same input produce
/// the same ids.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: u32,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    pub fn issued(&self) -> u32 {
        self.next
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LamiaType {
    /// string
    Radiant,
    /// number
    Shimmer,
    /// boolean
    Lumina,
    /// null
    VoidStar,
    /// array
    Constellation,
    /// map
    Nebula,
    /// function
    Galaxy,
    /// union or unknown
    Prism,
    /// class
    Crystal,
    /// async value
    Aurora,
    Widget,
    Theme,
    Vault,
    Portal,
}

impl LamiaType {
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "radiant" => LamiaType::Radiant,
            "shimmer" => LamiaType::Shimmer,
            "lumina" => LamiaType::Lumina,
            "void_star" => LamiaType::VoidStar,
            "constellation" => LamiaType::Constellation,
            "nebula" => LamiaType::Nebula,
            "galaxy" => LamiaType::Galaxy,
            "prism" => LamiaType::Prism,
            "crystal" => LamiaType::Crystal,
            "aurora" => LamiaType::Aurora,
            "widget" => LamiaType::Widget,
            "theme" => LamiaType::Theme,
            "vault" => LamiaType::Vault,
            "portal" => LamiaType::Portal,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            LamiaType::Radiant => "radiant",
            LamiaType::Shimmer => "shimmer",
            LamiaType::Lumina => "lumina",
            LamiaType::VoidStar => "void_star",
            LamiaType::Constellation => "constellation",
            LamiaType::Nebula => "nebula",
            LamiaType::Galaxy => "galaxy",
            LamiaType::Prism => "prism",
            LamiaType::Crystal => "crystal",
            LamiaType::Aurora => "aurora",
            LamiaType::Widget => "widget",
            LamiaType::Theme => "theme",
            LamiaType::Vault => "vault",
            LamiaType::Portal => "portal",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BinaryOperator {
    Pipeline,
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Power,
}

impl BinaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "~>" => BinaryOperator::Pipeline,
            "||" => BinaryOperator::Or,
            "&&" => BinaryOperator::And,
            "==" => BinaryOperator::Equal,
            "!=" => BinaryOperator::NotEqual,
            "<" => BinaryOperator::Less,
            ">" => BinaryOperator::Greater,
            "<=" => BinaryOperator::LessEqual,
            ">=" => BinaryOperator::GreaterEqual,
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Subtract,
            "*" => BinaryOperator::Multiply,
            "/" => BinaryOperator::Divide,
            "%" => BinaryOperator::Remainder,
            "**" => BinaryOperator::Power,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Pipeline => "~>",
            BinaryOperator::Or => "||",
            BinaryOperator::And => "&&",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::Greater => ">",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Remainder => "%",
            BinaryOperator::Power => "**",
        }
    }

    /// Binding strength, 1 (pipeline) to 8 (power).
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Pipeline => 1,
            BinaryOperator::Or => 2,
            BinaryOperator::And => 3,
            BinaryOperator::Equal | BinaryOperator::NotEqual => 4,
            BinaryOperator::Less
            | BinaryOperator::Greater
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterEqual => 5,
            BinaryOperator::Add | BinaryOperator::Subtract => 6,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Remainder => 7,
            BinaryOperator::Power => 8,
        }
    }

    pub fn is_right_associative(self) -> bool {
        self == BinaryOperator::Power
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
                | BinaryOperator::Remainder
                | BinaryOperator::Power
        )
    }

    pub fn result_type(self, lhs: LamiaType, rhs: LamiaType) -> LamiaType {
        match self {
            BinaryOperator::Pipeline => LamiaType::Prism,
            BinaryOperator::Add if lhs == LamiaType::Radiant || rhs == LamiaType::Radiant => {
                LamiaType::Radiant
            }
            op if op.is_arithmetic() => LamiaType::Shimmer,
            _ => LamiaType::Lumina,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnaryOperator {
    Not,
    Negate,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Negate => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssignOperator {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
}

impl AssignOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "=" => AssignOperator::Assign,
            "+=" => AssignOperator::AddAssign,
            "-=" => AssignOperator::SubtractAssign,
            "*=" => AssignOperator::MultiplyAssign,
            "/=" => AssignOperator::DivideAssign,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            AssignOperator::Assign => "=",
            AssignOperator::AddAssign => "+=",
            AssignOperator::SubtractAssign => "-=",
            AssignOperator::MultiplyAssign => "*=",
            AssignOperator::DivideAssign => "/=",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiteralValue {
    Str(String),
    /// Number kept as written in the source.
    Number(String),
    Bool(bool),
    Null,
    /// Template literal kept raw, back-ticks included.
    Template(String),
    Array(Vec<Expression>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub name: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub widget_type: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Expression>,
    pub theme: String,
}

impl Widget {
    pub fn new(widget_type: &str, theme: &str) -> Self {
        Self {
            widget_type: widget_type.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            theme: theme.to_string(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Expression> {
        find_attribute(&self.attributes, name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }
}

pub(crate) fn find_attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a Expression> {
    attributes.iter().find(|a| a.name == name).map(|a| &a.value)
}

/// Append `name: value` unless the key exists; the rejected value is handed back.
pub(crate) fn insert_attribute(
    attributes: &mut Vec<Attribute>,
    name: String,
    value: Expression,
) -> Result<(), Expression> {
    if attributes.iter().any(|a| a.name == name) {
        return Err(value);
    }
    attributes.push(Attribute { name, value });
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub selector: String,
    pub properties: Vec<Attribute>,
    pub theme: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub target: String,
    pub source: Box<Expression>,
    pub two_way: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handler {
    pub event: String,
    pub target: Option<String>,
    pub body: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conditional {
    pub condition: Box<Expression>,
    pub then_branch: Vec<Expression>,
    /// `otherwise when …` is stored as a single nested conditional.
    pub otherwise: Option<Vec<Expression>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopKind {
    While,
    ForEach { item: String },
    Until,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loop {
    pub kind: LoopKind,
    /// Condition for while/until, iterable for for-each.
    pub subject: Box<Expression>,
    pub body: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    pub param_type: Option<LamiaType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_type: Option<LamiaType>,
    pub body: Vec<Expression>,
    pub annotations: Vec<String>,
}

impl Function {
    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a == name)
    }

    /// `name(a: radiant, b) -> shimmer`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| match p.param_type {
                Some(t) => format!("{}: {}", p.name, t.keyword()),
                None => p.name.clone(),
            })
            .collect();
        match self.return_type {
            Some(t) => format!("{}({}) -> {}", self.name, params.join(", "), t.keyword()),
            None => format!("{}({})", self.name, params.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub name: String,
    pub base: Option<String>,
    /// Function-def nodes only.
    pub methods: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Import {
    pub names: Vec<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub callee: String,
    pub args: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub target: String,
    pub op: AssignOperator,
    pub value: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Program(Vec<Expression>),
    Literal(LiteralValue),
    Identifier(String),
    BinaryOp {
        op: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    WidgetCreation(Widget),
    StyleApplication(Style),
    DataBinding(Binding),
    EventHandling(Handler),
    Conditional(Conditional),
    Loop(Loop),
    FunctionDef(Function),
    ClassDef(Class),
    Import(Import),
    Return(Option<Box<Expression>>),
    Call(Call),
    Assignment(Assignment),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expression {
    pub id: NodeId,
    pub kind: NodeKind,
    pub value_type: LamiaType,
    pub location: Option<SourceLocation>,
    pub defined_in: Option<NodeId>,
}

impl Expression {
    pub fn new(id: NodeId, kind: NodeKind, value_type: LamiaType) -> Self {
        Self {
            id,
            kind,
            value_type,
            location: None,
            defined_in: None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Program(_) => "program",
            NodeKind::Literal(_) => "literal",
            NodeKind::Identifier(_) => "identifier",
            NodeKind::BinaryOp { .. } => "binary-op",
            NodeKind::UnaryOp { .. } => "unary-op",
            NodeKind::WidgetCreation(_) => "widget-creation",
            NodeKind::StyleApplication(_) => "style-application",
            NodeKind::DataBinding(_) => "data-binding",
            NodeKind::EventHandling(_) => "event-handling",
            NodeKind::Conditional(_) => "conditional",
            NodeKind::Loop(_) => "loop",
            NodeKind::FunctionDef(_) => "function-def",
            NodeKind::ClassDef(_) => "class-def",
            NodeKind::Import(_) => "import",
            NodeKind::Return(_) => "return",
            NodeKind::Call(_) => "call",
            NodeKind::Assignment(_) => "assignment",
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<&Expression> {
        match &self.kind {
            NodeKind::Program(statements) => statements.iter().collect(),
            NodeKind::Literal(LiteralValue::Array(items)) => items.iter().collect(),
            NodeKind::Literal(_) | NodeKind::Identifier(_) | NodeKind::Import(_) => Vec::new(),
            NodeKind::BinaryOp { lhs, rhs, .. } => vec![lhs.as_ref(), rhs.as_ref()],
            NodeKind::UnaryOp { operand, .. } => vec![operand.as_ref()],
            NodeKind::WidgetCreation(widget) => widget
                .attributes
                .iter()
                .map(|a| &a.value)
                .chain(widget.children.iter())
                .collect(),
            NodeKind::StyleApplication(style) => style.properties.iter().map(|a| &a.value).collect(),
            NodeKind::DataBinding(binding) => vec![binding.source.as_ref()],
            NodeKind::EventHandling(handler) => handler.body.iter().collect(),
            NodeKind::Conditional(conditional) => std::iter::once(conditional.condition.as_ref())
                .chain(conditional.then_branch.iter())
                .chain(conditional.otherwise.iter().flatten())
                .collect(),
            NodeKind::Loop(lp) => std::iter::once(lp.subject.as_ref())
                .chain(lp.body.iter())
                .collect(),
            NodeKind::FunctionDef(function) => function.body.iter().collect(),
            NodeKind::ClassDef(class) => class.methods.iter().collect(),
            NodeKind::Return(value) => value.iter().map(|v| v.as_ref()).collect(),
            NodeKind::Call(call) => call.args.iter().collect(),
            NodeKind::Assignment(assignment) => vec![assignment.value.as_ref()],
        }
    }

    /// Statements of a program root; any other node is its own single statement.
    pub fn statements(&self) -> &[Expression] {
        match &self.kind {
            NodeKind::Program(statements) => statements,
            _ => std::slice::from_ref(self),
        }
    }

    pub fn as_widget(&self) -> Option<&Widget> {
        match &self.kind {
            NodeKind::WidgetCreation(widget) => Some(widget),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match &self.kind {
            NodeKind::FunctionDef(function) => Some(function),
            _ => None,
        }
    }

    /// Total number of nodes in this subtree, itself included.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(|c| c.node_count()).sum::<usize>()
    }
}
