use crate::error::{Error, Result};
use crate::node::{Node, NodeKind, Operand};

/// Replaces pseudo instructions with real ones.
///
/// The returned sequence must hold no `Pseudo` node and keep every other node
/// in its original relative order.
pub trait Expand {
    /// Whether the front end should emit `mnemonic` as a pseudo instruction.
    fn is_pseudo(&self, mnemonic: &str) -> bool;

    fn expand(&self, nodes: Vec<Node>) -> Result<Vec<Node>>;
}

/// Hand the sequence to the expander and adopt what it returns.
pub fn unwind(nodes: Vec<Node>, expander: &dyn Expand) -> Result<Vec<Node>> {
    let nodes = expander.expand(nodes)?;
    if let Some(node) = nodes
        .iter()
        .find(|n| matches!(n.kind, NodeKind::Pseudo { .. }))
    {
        return Err(Error::UnexpandedPseudo(node.to_string()).at(node.pos.as_ref()));
    }
    Ok(nodes)
}

// ----------------------------------------------------------------------------
// Builtin expansion rules

type Rule = fn(&[Operand]) -> Vec<Node>;

fn zero() -> Operand {
    Operand::Reg("zero".to_string())
}

fn inc(o: &[Operand]) -> Vec<Node> {
    vec![Node::inst("addi", vec![o[0].clone(), Operand::Imm(1)])]
}

fn dec(o: &[Operand]) -> Vec<Node> {
    vec![Node::inst("subi", vec![o[0].clone(), Operand::Imm(1)])]
}

fn clr(o: &[Operand]) -> Vec<Node> {
    vec![Node::inst("xor", vec![o[0].clone(), o[0].clone()])]
}

fn neg(o: &[Operand]) -> Vec<Node> {
    vec![
        Node::inst("not", vec![o[0].clone()]),
        Node::inst("addi", vec![o[0].clone(), Operand::Imm(1)]),
    ]
}

fn b(o: &[Operand]) -> Vec<Node> {
    vec![Node::inst("jmp", vec![o[0].clone()])]
}

fn beqz(o: &[Operand]) -> Vec<Node> {
    vec![Node::inst("beq", vec![o[0].clone(), zero(), o[1].clone()])]
}

fn bnez(o: &[Operand]) -> Vec<Node> {
    vec![Node::inst("bne", vec![o[0].clone(), zero(), o[1].clone()])]
}

#[rustfmt::skip]
const RULES: &[(&str, usize, Rule)] = &[
    ("inc",  1, inc),
    ("dec",  1, dec),
    ("clr",  1, clr),
    ("neg",  1, neg),
    ("b",    1, b),
    ("beqz", 2, beqz),
    ("bnez", 2, bnez),
];

/// Table-driven expander for the builtin instruction set.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pseudo;

impl Pseudo {
    fn rule(mnemonic: &str) -> Option<(usize, Rule)> {
        RULES
            .iter()
            .find(|(name, _, _)| *name == mnemonic)
            .map(|&(_, arity, rule)| (arity, rule))
    }
}

impl Expand for Pseudo {
    fn is_pseudo(&self, mnemonic: &str) -> bool {
        Pseudo::rule(mnemonic).is_some()
    }

    fn expand(&self, nodes: Vec<Node>) -> Result<Vec<Node>> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match &node.kind {
                NodeKind::Pseudo { mnemonic, operands } => {
                    let (arity, rule) = Pseudo::rule(mnemonic).ok_or_else(|| {
                        Error::UnknownPseudo(mnemonic.clone()).at(node.pos.as_ref())
                    })?;
                    if operands.len() != arity {
                        return Err(Error::PseudoArityMismatch(
                            mnemonic.clone(),
                            arity,
                            operands.len(),
                        )
                        .at(node.pos.as_ref()));
                    }
                    out.extend(rule(operands).into_iter().map(|n| n.at(node.pos.clone())));
                }
                _ => out.push(node),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(name: &str) -> Operand {
        Operand::Reg(name.to_string())
    }

    #[test]
    fn expands_in_place() {
        let nodes = vec![
            Node::label("main"),
            Node::pseudo("neg", vec![reg("r1")]),
            Node::inst("halt", vec![]),
        ];
        let out = unwind(nodes, &Pseudo).unwrap();
        assert_eq!(
            out,
            vec![
                Node::label("main"),
                Node::inst("not", vec![reg("r1")]),
                Node::inst("addi", vec![reg("r1"), Operand::Imm(1)]),
                Node::inst("halt", vec![]),
            ]
        );
    }

    #[test]
    fn branch_on_zero() {
        let label = Operand::Label("loop".to_string());
        let out = unwind(vec![Node::pseudo("bnez", vec![reg("t0"), label.clone()])], &Pseudo)
            .unwrap();
        assert_eq!(out, vec![Node::inst("bne", vec![reg("t0"), zero(), label])]);
    }

    #[test]
    fn unknown_pseudo() {
        let err = unwind(vec![Node::pseudo("hoge", vec![])], &Pseudo).unwrap_err();
        assert!(matches!(err, Error::UnknownPseudo(m) if m == "hoge"));
    }

    #[test]
    fn pseudo_arity() {
        let err = unwind(vec![Node::pseudo("inc", vec![])], &Pseudo).unwrap_err();
        assert!(matches!(err, Error::PseudoArityMismatch(_, 1, 0)));
    }

    struct Lazy;

    impl Expand for Lazy {
        fn is_pseudo(&self, _: &str) -> bool {
            true
        }
        fn expand(&self, nodes: Vec<Node>) -> Result<Vec<Node>> {
            Ok(nodes)
        }
    }

    #[test]
    fn leftover_pseudo_is_rejected() {
        let err = unwind(vec![Node::pseudo("inc", vec![reg("r1")])], &Lazy).unwrap_err();
        assert!(matches!(err, Error::UnexpandedPseudo(_)));
    }
}
