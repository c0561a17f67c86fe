use crate::error::{Error, Result};
use crate::layout::Labels;
use crate::node::{Data, Node, NodeKind, Operand};
use arch::exe::WORD_SIZE;
use arch::inst::{InstSpec, InstTable};
use arch::op::Opcode;
use arch::reg::{RegTable, REG_COUNT};

/// Register id of `name`, checked against the register file size.
pub fn resolve_reg(regs: &RegTable, name: &str) -> Result<u8> {
    let id = regs
        .resolve(name)
        .ok_or_else(|| Error::InvalidRegisterName(name.to_string()))?;
    u8::try_from(id)
        .ok()
        .filter(|id| *id < REG_COUNT)
        .ok_or_else(|| Error::RegisterOutOfRange(name.to_string(), id))
}

/// Value of an immediate field for a label operand of an instruction at
/// `addr`.
pub fn displacement(spec: &InstSpec, target: i64, addr: i64) -> i64 {
    let mut imm = target;
    if spec.relative {
        imm -= addr + WORD_SIZE;
    }
    if spec.scaled {
        imm /= WORD_SIZE;
    }
    imm
}

pub struct Codegen<'a> {
    isa: &'a InstTable,
    regs: &'a RegTable,
    labels: &'a Labels,
}

impl<'a> Codegen<'a> {
    pub fn new(isa: &'a InstTable, regs: &'a RegTable, labels: &'a Labels) -> Self {
        Codegen { isa, regs, labels }
    }

    /// Body bytes of the whole sequence. `.bss` nodes contribute nothing.
    pub fn emit(&self, nodes: &[Node]) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        for node in nodes.iter().filter(|n| !n.is_bss()) {
            let bin = self.encode(node).map_err(|e| e.at(node.pos.as_ref()))?;
            body.extend(bin);
        }
        Ok(body)
    }

    /// Bytes of a single node.
    pub fn encode(&self, node: &Node) -> Result<Vec<u8>> {
        match &node.kind {
            NodeKind::Inst { mnemonic, operands } => {
                let addr = node
                    .addr
                    .ok_or_else(|| Error::UnplacedNode(node.to_string()))?;
                let op = self.opcode(mnemonic, operands, addr)?;
                Ok(op.to_bytes().to_vec())
            }
            NodeKind::Data {
                data: Data::Label(name),
                width,
            } => {
                let addr = self.labels.resolve(name)?;
                Ok(Data::Int(addr).encode(*width))
            }
            NodeKind::Data { data, width } => Ok(data.encode(*width)),
            NodeKind::Pseudo { .. } => Err(Error::UnexpandedPseudo(node.to_string())),
            NodeKind::Label(_) | NodeKind::Section(_) => Ok(vec![]),
        }
    }

    pub fn opcode(&self, mnemonic: &str, operands: &[Operand], addr: i64) -> Result<Opcode> {
        let spec = self
            .isa
            .get(mnemonic)
            .ok_or_else(|| Error::UnknownInstruction(mnemonic.to_string()))?;

        let mut op = Opcode::new(spec.opcode);
        let mut slot = 1;
        for (idx, operand) in operands.iter().enumerate() {
            match operand {
                Operand::Reg(name) => {
                    let id = resolve_reg(self.regs, name)?;
                    if !op.set_reg(slot, id) {
                        return Err(Error::InvalidOperandKind(
                            mnemonic.to_string(),
                            idx,
                            operand.to_string(),
                        ));
                    }
                    slot += 1;
                }
                Operand::Imm(v) => op.imm = fit(mnemonic, *v)?,
                Operand::Label(name) => {
                    let target = self.labels.resolve(name)?;
                    op.imm = fit(mnemonic, displacement(spec, target, addr))?;
                }
                Operand::Str(_) => {
                    return Err(Error::InvalidOperandKind(
                        mnemonic.to_string(),
                        idx,
                        operand.to_string(),
                    ))
                }
            }
        }
        Ok(op)
    }
}

fn fit(mnemonic: &str, v: i64) -> Result<i16> {
    i16::try_from(v).map_err(|_| Error::ImmediateOutOfRange(mnemonic.to_string(), v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::place;
    use arch::exe::BASE_ADDRESS;
    use arch::reg::DEFAULT_REGS;

    fn reg(name: &str) -> Operand {
        Operand::Reg(name.to_string())
    }

    fn label(name: &str) -> Operand {
        Operand::Label(name.to_string())
    }

    // mov r, i / jmp i (relative)
    fn small_isa() -> InstTable {
        InstTable::new([
            ("mov".to_string(), InstSpec::new(1, "ri", false, false).unwrap()),
            ("jmp".to_string(), InstSpec::new(2, "i", true, false).unwrap()),
            ("br".to_string(), InstSpec::new(3, "i", true, true).unwrap()),
            ("add".to_string(), InstSpec::new(4, "rr", false, false).unwrap()),
            ("ldw".to_string(), InstSpec::new(5, "ri", false, true).unwrap()),
        ])
        .unwrap()
    }

    fn program() -> Vec<Node> {
        place(
            vec![
                Node::inst("mov", vec![reg("r1"), Operand::Imm(5)]),
                Node::inst("jmp", vec![label("done")]),
                Node::label("done"),
                Node::inst("mov", vec![reg("r1"), Operand::Imm(0)]),
            ],
            BASE_ADDRESS,
        )
        .unwrap()
    }

    #[test]
    fn relative_jump_to_next() {
        let isa = small_isa();
        let nodes = program();
        let labels = Labels::collect(&nodes).unwrap();
        assert_eq!(labels.get("done"), Some(1032));

        let gen = Codegen::new(&isa, &DEFAULT_REGS, &labels);
        let body = gen.emit(&nodes).unwrap();
        assert_eq!(body.len(), 12);

        let word = |i: usize| Opcode::from_bin(u32::from_le_bytes(body[i..i + 4].try_into().unwrap()));
        assert_eq!(word(0), Opcode { cmd: 1, reg1: 1, reg2: 0, imm: 5 });
        assert_eq!(word(4), Opcode { cmd: 2, reg1: 0, reg2: 0, imm: 0 });
        assert_eq!(word(8), Opcode { cmd: 1, reg1: 1, reg2: 0, imm: 0 });
    }

    #[test]
    fn relative_and_scaled() {
        let isa = small_isa();
        let nodes = place(
            vec![
                Node::label("top"),
                Node::inst("mov", vec![reg("r1"), Operand::Imm(1)]),
                Node::inst("mov", vec![reg("r1"), Operand::Imm(2)]),
                Node::inst("jmp", vec![label("top")]),
                Node::inst("br", vec![label("top")]),
            ],
            BASE_ADDRESS,
        )
        .unwrap();
        let labels = Labels::collect(&nodes).unwrap();
        let gen = Codegen::new(&isa, &DEFAULT_REGS, &labels);

        // jmp @1032: 1024 - 1036
        assert_eq!(gen.opcode("jmp", &[label("top")], 1032).unwrap().imm, -12);
        // br @1036: (1024 - 1040) / 4
        assert_eq!(gen.opcode("br", &[label("top")], 1036).unwrap().imm, -4);
    }

    #[test]
    fn absolute_label() {
        let isa = small_isa();
        let nodes = program();
        let labels = Labels::collect(&nodes).unwrap();
        let gen = Codegen::new(&isa, &DEFAULT_REGS, &labels);
        let op = gen.opcode("mov", &[reg("a0"), label("done")], 1024).unwrap();
        assert_eq!((op.reg1, op.imm), (5, 1032));
    }

    #[test]
    fn scaled_absolute() {
        let isa = small_isa();
        let nodes = program();
        let labels = Labels::collect(&nodes).unwrap();
        let gen = Codegen::new(&isa, &DEFAULT_REGS, &labels);
        // 1032 / 4, independent of where the instruction sits
        assert_eq!(gen.opcode("ldw", &[reg("r2"), label("done")], 1024).unwrap().imm, 258);
        assert_eq!(gen.opcode("ldw", &[reg("r2"), label("done")], 2048).unwrap().imm, 258);
        // literal immediates are never scaled
        assert_eq!(gen.opcode("ldw", &[reg("r2"), Operand::Imm(12)], 1024).unwrap().imm, 12);
    }

    #[test]
    fn register_slots() {
        let isa = small_isa();
        let labels = Labels::new();
        let gen = Codegen::new(&isa, &DEFAULT_REGS, &labels);
        let op = gen.opcode("add", &[reg("t0"), reg("$3")], 0).unwrap();
        assert_eq!((op.cmd, op.reg1, op.reg2), (4, 8, 3));
    }

    #[test]
    fn register_errors() {
        assert_eq!(resolve_reg(&DEFAULT_REGS, "sp").unwrap(), 2);
        assert_eq!(resolve_reg(&DEFAULT_REGS, "r15").unwrap(), 15);
        assert!(matches!(
            resolve_reg(&DEFAULT_REGS, "r16"),
            Err(Error::RegisterOutOfRange(_, 16))
        ));
        assert!(matches!(
            resolve_reg(&DEFAULT_REGS, "r300"),
            Err(Error::RegisterOutOfRange(n, 300)) if n == "r300"
        ));
        assert!(matches!(
            resolve_reg(&DEFAULT_REGS, "r99999999999999999999999"),
            Err(Error::RegisterOutOfRange(_, u64::MAX))
        ));
        assert!(matches!(
            resolve_reg(&DEFAULT_REGS, "hoge"),
            Err(Error::InvalidRegisterName(n)) if n == "hoge"
        ));
    }

    #[test]
    fn undefined_label() {
        let isa = small_isa();
        let labels = Labels::new();
        let gen = Codegen::new(&isa, &DEFAULT_REGS, &labels);
        let err = gen.opcode("jmp", &[label("nowhere")], 1024).unwrap_err();
        assert!(matches!(err, Error::UndefinedLabel(n) if n == "nowhere"));
    }

    #[test]
    fn string_operand_is_rejected() {
        let isa = small_isa();
        let labels = Labels::new();
        let gen = Codegen::new(&isa, &DEFAULT_REGS, &labels);
        let err = gen
            .opcode("jmp", &[Operand::Str("hi".to_string())], 1024)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperandKind(_, 0, _)));
    }

    #[test]
    fn immediate_range() {
        let isa = small_isa();
        let labels = Labels::new();
        let gen = Codegen::new(&isa, &DEFAULT_REGS, &labels);
        assert_eq!(gen.opcode("mov", &[reg("r1"), Operand::Imm(-32768)], 0).unwrap().imm, i16::MIN);
        let err = gen.opcode("mov", &[reg("r1"), Operand::Imm(40000)], 0).unwrap_err();
        assert!(matches!(err, Error::ImmediateOutOfRange(_, 40000)));
    }

    #[test]
    fn bss_and_data() {
        let isa = small_isa();
        let mut nodes = vec![
            Node::data(Data::Int(0x11223344), 4),
            Node::data(Data::Bytes(b"ok".to_vec()), 3),
            Node::space(32),
        ];
        nodes[2].section = ".bss".to_string();
        let nodes = place(nodes, BASE_ADDRESS).unwrap();
        let labels = Labels::new();
        let gen = Codegen::new(&isa, &DEFAULT_REGS, &labels);
        let body = gen.emit(&nodes).unwrap();
        assert_eq!(body, vec![0x44, 0x33, 0x22, 0x11, b'o', b'k', 0]);
    }

    #[test]
    fn label_data() {
        let isa = small_isa();
        let nodes = place(
            vec![
                Node::label("table"),
                Node::data(Data::Label("end".to_string()), 4),
                Node::data(Data::Label("table".to_string()), 8),
                Node::label("end"),
            ],
            0x0102,
        )
        .unwrap();
        let labels = Labels::collect(&nodes).unwrap();
        let gen = Codegen::new(&isa, &DEFAULT_REGS, &labels);
        let body = gen.emit(&nodes).unwrap();
        // end = 0x0102 + 12
        assert_eq!(body[..4], [0x0E, 0x01, 0, 0]);
        assert_eq!(body[4..], [0x02, 0x01, 0, 0, 0, 0, 0, 0]);

        let dangling = vec![Node::data(Data::Label("nowhere".to_string()), 4)];
        let err = gen.emit(&place(dangling, 0).unwrap()).unwrap_err();
        assert!(matches!(err, Error::UndefinedLabel(n) if n == "nowhere"));
    }

    #[test]
    fn unplaced_instruction() {
        let isa = small_isa();
        let labels = Labels::new();
        let gen = Codegen::new(&isa, &DEFAULT_REGS, &labels);
        let err = gen
            .emit(&[Node::inst("mov", vec![reg("r1"), Operand::Imm(0)])])
            .unwrap_err();
        assert!(matches!(err, Error::UnplacedNode(_)));
    }
}
