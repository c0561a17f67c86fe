use crate::error::{Error, Result};
use crate::node::{Node, NodeKind, Operand};
use arch::inst::{Arg, InstTable};

/// Check every instruction against the table. Stops at the first violation.
pub fn verify(nodes: &[Node], isa: &InstTable) -> Result<()> {
    for node in nodes {
        if let NodeKind::Inst { mnemonic, operands } = &node.kind {
            check(mnemonic, operands, isa).map_err(|e| e.at(node.pos.as_ref()))?;
        }
    }
    Ok(())
}

fn check(mnemonic: &str, operands: &[Operand], isa: &InstTable) -> Result<()> {
    let spec = isa
        .get(mnemonic)
        .ok_or_else(|| Error::UnknownInstruction(mnemonic.to_string()))?;

    let args = spec.args.args();
    if operands.len() != args.len() {
        return Err(Error::ArityMismatch(
            mnemonic.to_string(),
            args.len(),
            operands.len(),
        ));
    }

    for (idx, (arg, operand)) in args.iter().zip(operands).enumerate() {
        let ok = match arg {
            Arg::Reg => matches!(operand, Operand::Reg(_)),
            Arg::Imm => matches!(operand, Operand::Imm(_) | Operand::Label(_)),
        };
        if !ok {
            return Err(Error::OperandKindMismatch(mnemonic.to_string(), idx, *arg));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch::inst::{InstSpec, DEFAULT_ISA};

    fn reg(name: &str) -> Operand {
        Operand::Reg(name.to_string())
    }

    fn label(name: &str) -> Operand {
        Operand::Label(name.to_string())
    }

    #[test]
    fn accepts_valid() {
        let nodes = vec![
            Node::label("main"),
            Node::inst("li", vec![reg("r1"), Operand::Imm(5)]),
            Node::inst("beq", vec![reg("r1"), reg("zero"), label("main")]),
            Node::inst("halt", vec![]),
            Node::pseudo("whatever", vec![]),
        ];
        assert!(verify(&nodes, &DEFAULT_ISA).is_ok());
    }

    #[test]
    fn unknown_instruction() {
        let nodes = vec![Node::inst("hoge", vec![])];
        assert!(matches!(
            verify(&nodes, &DEFAULT_ISA),
            Err(Error::UnknownInstruction(m)) if m == "hoge"
        ));
    }

    #[test]
    fn arity_law_holds_for_every_mnemonic() {
        for (name, spec) in DEFAULT_ISA.iter() {
            let expected = spec.args.len();
            for actual in [expected + 1, expected.wrapping_sub(1)] {
                if actual > 3 {
                    continue;
                }
                let nodes = vec![Node::inst(name, vec![Operand::Imm(0); actual])];
                match verify(&nodes, &DEFAULT_ISA) {
                    Err(Error::ArityMismatch(m, e, a)) => {
                        assert_eq!((m.as_str(), e, a), (name, expected, actual))
                    }
                    other => panic!("{}: {:?}", name, other),
                }
            }
        }
    }

    #[test]
    fn register_required() {
        let nodes = vec![Node::inst("push", vec![Operand::Imm(1)])];
        assert!(matches!(
            verify(&nodes, &DEFAULT_ISA),
            Err(Error::OperandKindMismatch(m, 0, Arg::Reg)) if m == "push"
        ));
    }

    #[test]
    fn immediate_required() {
        let nodes = vec![Node::inst("li", vec![reg("r1"), reg("r2")])];
        assert!(matches!(
            verify(&nodes, &DEFAULT_ISA),
            Err(Error::OperandKindMismatch(_, 1, Arg::Imm))
        ));

        let nodes = vec![Node::inst("li", vec![reg("r1"), Operand::Str("x".into())])];
        assert!(matches!(
            verify(&nodes, &DEFAULT_ISA),
            Err(Error::OperandKindMismatch(_, 1, Arg::Imm))
        ));
    }

    #[test]
    fn custom_table() {
        let isa = InstTable::new(vec![(
            "mov".to_string(),
            InstSpec::new(1, "ri", false, false).unwrap(),
        )])
        .unwrap();
        let ok = vec![Node::inst("mov", vec![reg("r1"), label("x")])];
        assert!(verify(&ok, &isa).is_ok());
        let bad = vec![Node::inst("li", vec![reg("r1"), Operand::Imm(1)])];
        assert!(matches!(verify(&bad, &isa), Err(Error::UnknownInstruction(_))));
    }
}
