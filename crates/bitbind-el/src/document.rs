//! Prose rendering of expressions, kept apart from evaluation.

use std::fmt::{self, Write};

use crate::{
    expression::{Expression, ExpressionType},
    logical::LogicalNode,
    node::Node,
    reference::Reference,
};

/// Renders a human-readable description into a text sink.
pub trait Describe {
    fn describe(&self, out: &mut dyn Write) -> fmt::Result;

    fn description(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.describe(&mut out);
        out
    }
}

/// Indefinite article for `word`, by how it is read aloud: "an 8-bit", "a 16-bit",
/// "an int", "a short".
pub fn article(word: &str) -> &'static str {
    let digits = word.chars().take_while(char::is_ascii_digit).count();
    let vowel_sound = if digits > 0 {
        // eight, eleven and eighteen, alone or as thousands
        word.starts_with('8')
            || ((word.starts_with("11") || word.starts_with("18")) && digits % 3 == 2)
    } else {
        word.chars()
            .next()
            .is_some_and(|c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u'))
    };

    if vowel_sound { "an" } else { "a" }
}

impl Describe for Reference {
    fn describe(&self, out: &mut dyn Write) -> fmt::Result {
        write!(out, "the value of {}", self.name())?;
        match self.depth() {
            0 => Ok(()),
            1 => write!(out, " in the enclosing {}", self.scope()),
            depth => write!(out, " in {} ({depth} scopes out)", self.scope()),
        }
    }
}

impl Describe for Node {
    fn describe(&self, out: &mut dyn Write) -> fmt::Result {
        match self {
            Node::Literal(value) => write!(out, "{value}"),
            Node::Reference(reference) => reference.describe(out),
            Node::Arithmetic(node) => {
                node.lhs().describe(out)?;
                write!(out, " {} ", node.operator().phrase())?;
                node.rhs().describe(out)
            }
            Node::Relational(node) => {
                node.lhs().describe(out)?;
                write!(out, " {} ", node.relation().phrase())?;
                node.rhs().describe(out)
            }
            Node::Logical(LogicalNode::And(lhs, rhs)) => {
                lhs.describe(out)?;
                out.write_str(", and ")?;
                rhs.describe(out)
            }
            Node::Logical(LogicalNode::Or(lhs, rhs)) => {
                lhs.describe(out)?;
                out.write_str(", or ")?;
                rhs.describe(out)
            }
            Node::Logical(LogicalNode::Not(operand)) => {
                out.write_str("not (")?;
                operand.describe(out)?;
                out.write_str(")")
            }
        }
    }
}

impl<T: ExpressionType> Describe for Expression<T> {
    fn describe(&self, out: &mut dyn Write) -> fmt::Result {
        self.node().describe(out)
    }
}
