// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! Predicate expressions for `DEFINE` conditions.
//!
//! A closed sum type covering the comparisons, column accesses, literals and
//! arithmetic offsets that appear in row-pattern `DEFINE` clauses. Keeping the
//! shape closed lets the classifier match exhaustively instead of inspecting
//! text.
//!
//! `Display` renders an expression back to SQL with the minimal parentheses
//! required by operator precedence, so rendering is deterministic regardless
//! of how the input was parenthesized.

use std::collections::BTreeSet;
use std::fmt;

use crate::common::duration::IntervalLiteral;
use crate::model::Symbol;

/// Access to a column, optionally qualified by a pattern symbol (`B.price`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Qualifying pattern symbol. `None` means the owning symbol.
    pub symbol: Option<Symbol>,
    /// Column name as written (may be a double-quoted identifier).
    pub column: String,
}

impl ColumnRef {
    /// Creates a column reference qualified by `symbol`.
    #[must_use]
    pub fn qualified(symbol: Symbol, column: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol),
            column: column.into(),
        }
    }

    /// Creates an unqualified column reference.
    #[must_use]
    pub fn bare(column: impl Into<String>) -> Self {
        Self {
            symbol: None,
            column: column.into(),
        }
    }

    /// Returns true if this column has the given name (case-insensitive,
    /// ignoring surrounding double quotes).
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        unquote(&self.column).eq_ignore_ascii_case(unquote(name))
    }
}

fn unquote(ident: &str) -> &str {
    ident
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(ident)
}

/// Literal values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Unsigned numeric literal, kept verbatim (`30`, `0.01`).
    Number(String),
    /// String literal without the enclosing quotes.
    String(String),
    /// `INTERVAL '30' MINUTE`.
    Interval(IntervalLiteral),
    /// `TRUE` / `FALSE`.
    Bool(bool),
    /// `NULL`.
    Null,
}

/// Arithmetic and string operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `||`
    Concat,
}

impl BinaryOp {
    const fn precedence(self) -> u8 {
        match self {
            Self::Add | Self::Sub | Self::Concat => PREC_ADD,
            Self::Mul | Self::Div | Self::Mod => PREC_MUL,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Concat => "||",
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>` (also parsed from `!=`)
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
}

impl CompareOp {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

/// A `DEFINE` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Column access.
    Column(ColumnRef),
    /// Literal value.
    Literal(Literal),
    /// `*` inside `count(*)`.
    Star,
    /// Unary minus.
    Neg(Box<Expr>),
    /// Arithmetic; `sym.col ± constant` offsets are `Add`/`Sub` nodes.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// Comparison.
    Compare {
        /// Operator.
        op: CompareOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// `NOT expr`.
    Not(Box<Expr>),
    /// `lhs AND rhs`.
    And(Box<Expr>, Box<Expr>),
    /// `lhs OR rhs`.
    Or(Box<Expr>, Box<Expr>),
    /// `expr IS [NOT] NULL`.
    IsNull {
        /// Tested expression.
        expr: Box<Expr>,
        /// `IS NOT NULL` when true.
        negated: bool,
    },
    /// `expr [NOT] BETWEEN low AND high`.
    Between {
        /// Tested expression.
        expr: Box<Expr>,
        /// Lower bound.
        low: Box<Expr>,
        /// Upper bound.
        high: Box<Expr>,
        /// `NOT BETWEEN` when true.
        negated: bool,
    },
    /// `expr [NOT] IN (list)`.
    InList {
        /// Tested expression.
        expr: Box<Expr>,
        /// Candidate values.
        list: Vec<Expr>,
        /// `NOT IN` when true.
        negated: bool,
    },
    /// `CAST(expr AS type)`.
    Cast {
        /// Converted expression.
        expr: Box<Expr>,
        /// Target type as written.
        ty: String,
    },
    /// Function call, including navigation functions like `PREV`.
    Call {
        /// Function name as written.
        name: String,
        /// Arguments.
        args: Vec<Expr>,
    },
}

const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_NOT: u8 = 3;
const PREC_CMP: u8 = 4;
const PREC_ADD: u8 = 5;
const PREC_MUL: u8 = 6;
const PREC_NEG: u8 = 7;
const PREC_ATOM: u8 = 8;

impl Expr {
    /// Shorthand for a qualified column.
    #[must_use]
    pub fn column(symbol: &Symbol, column: &str) -> Self {
        Self::Column(ColumnRef::qualified(symbol.clone(), column))
    }

    /// Shorthand for a binary node.
    #[must_use]
    pub fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Shorthand for a comparison node.
    #[must_use]
    pub fn compare(op: CompareOp, lhs: Self, rhs: Self) -> Self {
        Self::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Splits a top-level conjunction into its conjuncts, left to right.
    ///
    /// `A AND (B AND C)` and `(A AND B) AND C` both yield `[A, B, C]`;
    /// anything that is not an `AND` node is a single conjunct.
    #[must_use]
    pub fn into_conjuncts(self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Self::And(lhs, rhs) => {
                    stack.push(*rhs);
                    stack.push(*lhs);
                }
                other => out.push(other),
            }
        }
        out
    }

    /// Returns a copy in which every unqualified column is qualified by `owner`.
    #[must_use]
    pub fn qualified_by(&self, owner: &Symbol) -> Self {
        self.map_columns(&|col: &ColumnRef| match col.symbol {
            Some(_) => Self::Column(col.clone()),
            None => Self::Column(ColumnRef::qualified(owner.clone(), col.column.clone())),
        })
    }

    /// Rebuilds the expression, replacing every column with `f(column)`.
    #[must_use]
    pub fn map_columns(&self, f: &dyn Fn(&ColumnRef) -> Self) -> Self {
        let map = |e: &Self| Box::new(e.map_columns(f));
        match self {
            Self::Column(col) => f(col),
            Self::Literal(_) | Self::Star => self.clone(),
            Self::Neg(e) => Self::Neg(map(e)),
            Self::Not(e) => Self::Not(map(e)),
            Self::Binary { op, lhs, rhs } => Self::Binary {
                op: *op,
                lhs: map(lhs),
                rhs: map(rhs),
            },
            Self::Compare { op, lhs, rhs } => Self::Compare {
                op: *op,
                lhs: map(lhs),
                rhs: map(rhs),
            },
            Self::And(l, r) => Self::And(map(l), map(r)),
            Self::Or(l, r) => Self::Or(map(l), map(r)),
            Self::IsNull { expr, negated } => Self::IsNull {
                expr: map(expr),
                negated: *negated,
            },
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => Self::Between {
                expr: map(expr),
                low: map(low),
                high: map(high),
                negated: *negated,
            },
            Self::InList {
                expr,
                list,
                negated,
            } => Self::InList {
                expr: map(expr),
                list: list.iter().map(|e| e.map_columns(f)).collect(),
                negated: *negated,
            },
            Self::Cast { expr, ty } => Self::Cast {
                expr: map(expr),
                ty: ty.clone(),
            },
            Self::Call { name, args } => Self::Call {
                name: name.clone(),
                args: args.iter().map(|e| e.map_columns(f)).collect(),
            },
        }
    }

    /// Visits every node in pre-order.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Self)) {
        f(self);
        match self {
            Self::Column(_) | Self::Literal(_) | Self::Star => {}
            Self::Neg(e) | Self::Not(e) | Self::Cast { expr: e, .. } => e.walk(f),
            Self::IsNull { expr, .. } => expr.walk(f),
            Self::Binary { lhs, rhs, .. }
            | Self::Compare { lhs, rhs, .. }
            | Self::And(lhs, rhs)
            | Self::Or(lhs, rhs) => {
                lhs.walk(f);
                rhs.walk(f);
            }
            Self::Between {
                expr, low, high, ..
            } => {
                expr.walk(f);
                low.walk(f);
                high.walk(f);
            }
            Self::InList { expr, list, .. } => {
                expr.walk(f);
                for item in list {
                    item.walk(f);
                }
            }
            Self::Call { args, .. } => {
                for arg in args {
                    arg.walk(f);
                }
            }
        }
    }

    /// Returns every symbol that qualifies a column in this expression.
    #[must_use]
    pub fn qualifiers(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.walk(&mut |e| {
            if let Self::Column(ColumnRef {
                symbol: Some(sym), ..
            }) = e
            {
                out.insert(sym.clone());
            }
        });
        out
    }

    /// Returns the name of every function called in this expression.
    #[must_use]
    pub fn called_functions(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let Self::Call { name, .. } = e {
                out.push(name.as_str());
            }
        });
        out
    }

    const fn precedence(&self) -> u8 {
        match self {
            Self::Or(..) => PREC_OR,
            Self::And(..) => PREC_AND,
            Self::Not(_) => PREC_NOT,
            Self::Compare { .. }
            | Self::IsNull { .. }
            | Self::Between { .. }
            | Self::InList { .. } => PREC_CMP,
            Self::Binary { op, .. } => op.precedence(),
            Self::Neg(_) => PREC_NEG,
            Self::Column(_) | Self::Literal(_) | Self::Star | Self::Cast { .. } | Self::Call { .. } => {
                PREC_ATOM
            }
        }
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "(")?;
            self.fmt_bare(f)?;
            write!(f, ")")
        } else {
            self.fmt_bare(f)
        }
    }

    fn fmt_bare(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(col) => write!(f, "{col}"),
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Star => write!(f, "*"),
            Self::Neg(e) => {
                write!(f, "-")?;
                // `- -x` would render as a line comment
                if matches!(**e, Self::Neg(_)) {
                    e.fmt_prec(f, PREC_ATOM)
                } else {
                    e.fmt_prec(f, PREC_NEG)
                }
            }
            Self::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                lhs.fmt_prec(f, prec)?;
                write!(f, " {} ", op.as_str())?;
                rhs.fmt_prec(f, prec + 1)
            }
            Self::Compare { op, lhs, rhs } => {
                lhs.fmt_prec(f, PREC_ADD)?;
                write!(f, " {} ", op.as_str())?;
                rhs.fmt_prec(f, PREC_ADD)
            }
            Self::Not(e) => {
                write!(f, "NOT ")?;
                e.fmt_prec(f, PREC_NOT)
            }
            Self::And(lhs, rhs) => {
                lhs.fmt_prec(f, PREC_AND)?;
                write!(f, " AND ")?;
                rhs.fmt_prec(f, PREC_NOT)
            }
            Self::Or(lhs, rhs) => {
                lhs.fmt_prec(f, PREC_OR)?;
                write!(f, " OR ")?;
                rhs.fmt_prec(f, PREC_AND)
            }
            Self::IsNull { expr, negated } => {
                expr.fmt_prec(f, PREC_ADD)?;
                if *negated {
                    write!(f, " IS NOT NULL")
                } else {
                    write!(f, " IS NULL")
                }
            }
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => {
                expr.fmt_prec(f, PREC_ADD)?;
                write!(f, "{} BETWEEN ", if *negated { " NOT" } else { "" })?;
                low.fmt_prec(f, PREC_ADD)?;
                write!(f, " AND ")?;
                high.fmt_prec(f, PREC_ADD)
            }
            Self::InList {
                expr,
                list,
                negated,
            } => {
                expr.fmt_prec(f, PREC_ADD)?;
                write!(f, "{} IN (", if *negated { " NOT" } else { "" })?;
                write_list(f, list)?;
                write!(f, ")")
            }
            Self::Cast { expr, ty } => {
                write!(f, "CAST(")?;
                expr.fmt_prec(f, 0)?;
                write!(f, " AS {ty})")
            }
            Self::Call { name, args } => {
                write!(f, "{name}(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        item.fmt_prec(f, 0)?;
    }
    Ok(())
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Some(sym) => write!(f, "{sym}.{}", self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Interval(iv) => write!(f, "{iv}"),
            Self::Bool(true) => write!(f, "TRUE"),
            Self::Bool(false) => write!(f, "FALSE"),
            Self::Null => write!(f, "NULL"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}
