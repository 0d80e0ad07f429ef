//! Code generation: walks the AST and fills a 256-byte image.
//!
//! Emission happens in one pass with symbolic operands. Each declared
//! variable and each intermediate value gets a [`Temp`]; references to it
//! are written as `[Temp(id), 00]` and every forward branch as a
//! `Jump(id)` placeholder. Once the final `BRK` is written, temps are laid
//! out back to back directly after the code and every placeholder cell is
//! replaced by its resolved byte.

use std::collections::HashMap;

use crate::error::CodeGenError;
use crate::event::{Event, LogSink, Phase, Profile, Severity};
use crate::grammar::{GrammarNode, Production};
use crate::image::{Address, Executable, ExecutionImage, IMAGE_SIZE, JumpId, TempId};
use crate::machine::opcode;
use crate::scope::{SymbolId, VarType};
use crate::semantic::Analysis;
use crate::token::TokenKind;
use crate::tree::NodeId;

/// A static storage slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Temp {
    /// Variable stored here, or `None` for an intermediate value.
    pub symbol: Option<SymbolId>,
    pub register: usize,
    /// Bytes reserved. Always 1: a string variable holds a one-byte
    /// pointer to its heap literal rather than the literal's bytes, so its
    /// slot does not grow with the text length.
    pub size: usize,
    pub address: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jump {
    pub label: String,
    pub distance: Option<u8>,
}

pub fn generate(analysis: &Analysis, sink: &mut dyn LogSink) -> Result<Executable, CodeGenError> {
    CodeGenerator::new(analysis, sink).generate()
}

/// Value an AST operand evaluates to.
#[derive(Debug, Clone, Copy)]
enum Operand<'t> {
    Digit(u8),
    Bool(bool),
    Str(&'t str),
    Var(SymbolId),
    Sum(NodeId),
    Compare { equal: bool, node: NodeId },
}

pub struct CodeGenerator<'a> {
    analysis: &'a Analysis,
    image: ExecutionImage,
    temps: Vec<Temp>,
    jumps: Vec<Jump>,
    variables: HashMap<SymbolId, TempId>,
    strings: HashMap<String, u8>,
    /// Never written, so it always reads as zero.
    zero: Option<TempId>,
    sink: &'a mut dyn LogSink,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(analysis: &'a Analysis, sink: &'a mut dyn LogSink) -> Self {
        CodeGenerator {
            analysis,
            image: ExecutionImage::new(),
            temps: Vec::new(),
            jumps: Vec::new(),
            variables: HashMap::new(),
            strings: HashMap::new(),
            zero: None,
            sink,
        }
    }

    pub fn generate(mut self) -> Result<Executable, CodeGenError> {
        self.emit_program().inspect_err(|error| {
            self.sink
                .emit(Event::new(Phase::CodeGen, Severity::Error, error.to_string()));
        })
    }

    fn emit_program(&mut self) -> Result<Executable, CodeGenError> {
        let root = self.analysis.ast.root().ok_or_else(|| CodeGenError::MalformedAst {
            node: "empty tree".to_string(),
        })?;
        self.log("began code generation", Profile::Verbose);
        self.statement(root)?;

        self.log("end of program, writing BRK", Profile::Everything);
        self.byte(opcode::BRK)?;
        let code_len = self.image.position();

        self.log(
            format!("image before backpatching:\n{}", self.image.render()),
            Profile::Everything,
        );
        let static_len = self.layout_temps(code_len)?;
        let bytes = self.backpatch()?;

        let executable = Executable {
            bytes,
            code_len,
            static_len,
            heap_start: self.image.heap_start(),
        };
        self.sink.emit(
            Event::new(
                Phase::CodeGen,
                Severity::Message,
                format!("image:\n{}", executable.hex_dump()),
            )
            .profile(Profile::Verbose),
        );
        self.sink.emit(Event::new(
            Phase::CodeGen,
            Severity::Message,
            format!(
                "code generation completed: {code_len} code bytes, {static_len} static bytes, {} heap bytes",
                IMAGE_SIZE - executable.heap_start
            ),
        ));
        Ok(executable)
    }

    // ----------------------------------------------------------------------
    // Statements
    // ----------------------------------------------------------------------

    fn statement(&mut self, id: NodeId) -> Result<(), CodeGenError> {
        let analysis = self.analysis;
        let ast = &analysis.ast;
        match ast.value(id) {
            GrammarNode::Branch(Production::Block) => {
                for &child in ast.children(id) {
                    self.statement(child)?;
                }
                Ok(())
            }
            GrammarNode::Branch(Production::VarDecl) => self.var_decl(id),
            GrammarNode::Branch(Production::AssignmentStatement) => self.assignment(id),
            GrammarNode::Branch(Production::PrintStatement) => self.print(id),
            GrammarNode::Branch(Production::IfStatement) => self.if_statement(id),
            GrammarNode::Branch(Production::WhileStatement) => self.while_statement(id),
            other => Err(malformed(other)),
        }
    }

    fn var_decl(&mut self, id: NodeId) -> Result<(), CodeGenError> {
        let [_, name] = self.pair(id)?;
        let symbol = self.binding(name)?;
        let temp = self.new_temp(Some(symbol));
        self.variables.insert(symbol, temp);
        self.log(
            format!(
                "declaring '{}' in T{}",
                self.analysis.scopes.symbol(symbol).name,
                temp.index()
            ),
            Profile::Verbose,
        );
        // Strings start out pointing at an empty literal so an unassigned
        // one prints nothing.
        let declared_type = self.analysis.scopes.symbol(symbol).declared_type;
        let initial = match declared_type {
            VarType::String => Address::Heap(self.intern("")?),
            _ => Address::Const(0),
        };
        self.load_constant(initial)?;
        self.store(temp)
    }

    fn assignment(&mut self, id: NodeId) -> Result<(), CodeGenError> {
        let [target, value] = self.pair(id)?;
        let symbol = self.binding(target)?;
        let temp = self.variable(symbol)?;
        let value = self.operand(value)?;
        self.load_accumulator(value)?;
        self.store(temp)
    }

    fn print(&mut self, id: NodeId) -> Result<(), CodeGenError> {
        let analysis = self.analysis;
        let ast = &analysis.ast;
        let &[value] = ast.children(id) else {
            return Err(malformed(ast.value(id)));
        };
        match self.operand(value)? {
            Operand::Digit(digit) => {
                self.op_immediate(opcode::LDY_CONST, Address::Const(digit))?;
                self.system_call(1)
            }
            Operand::Str(text) => {
                let at = self.intern(text)?;
                self.op_immediate(opcode::LDY_CONST, Address::Heap(at))?;
                self.system_call(2)
            }
            Operand::Bool(value) => {
                let at = self.intern(bool_text(value))?;
                self.op_immediate(opcode::LDY_CONST, Address::Heap(at))?;
                self.system_call(2)
            }
            Operand::Var(symbol) => {
                let temp = self.variable(symbol)?;
                match self.analysis.scopes.symbol(symbol).declared_type {
                    VarType::Int => {
                        self.op_memory(opcode::LDY_MEM, temp)?;
                        self.system_call(1)
                    }
                    VarType::String => {
                        self.op_memory(opcode::LDY_MEM, temp)?;
                        self.system_call(2)
                    }
                    VarType::Boolean => self.print_boolean(temp),
                    VarType::None => Err(malformed(ast.value(value))),
                }
            }
            sum @ Operand::Sum(_) => {
                let temp = self.to_memory(sum)?;
                self.op_memory(opcode::LDY_MEM, temp)?;
                self.system_call(1)
            }
            compare @ Operand::Compare { .. } => {
                let temp = self.to_memory(compare)?;
                self.print_boolean(temp)
            }
        }
    }

    /// Print "true" or "false" depending on a 0/1 value in memory.
    fn print_boolean(&mut self, value: TempId) -> Result<(), CodeGenError> {
        let truthy = self.intern("true")?;
        let falsy = self.intern("false")?;
        self.op_immediate(opcode::LDX_CONST, Address::Const(1))?;
        self.op_memory(opcode::CPX, value)?;
        self.op_immediate(opcode::LDY_CONST, Address::Heap(falsy))?;
        self.op_immediate(opcode::BNE, Address::Const(2))?;
        self.op_immediate(opcode::LDY_CONST, Address::Heap(truthy))?;
        self.system_call(2)
    }

    fn if_statement(&mut self, id: NodeId) -> Result<(), CodeGenError> {
        let [condition, body] = self.pair(id)?;
        self.condition(condition)?;
        let (jump, operand_at) = self.forward_branch()?;
        self.statement(body)?;
        self.land(jump, operand_at);
        Ok(())
    }

    fn while_statement(&mut self, id: NodeId) -> Result<(), CodeGenError> {
        let [condition, body] = self.pair(id)?;
        let start = self.image.position();
        self.condition(condition)?;
        let (jump, operand_at) = self.forward_branch()?;
        self.statement(body)?;

        // Unconditional branch back to the condition: X = 1 never equals zero.
        let zero = self.zero_temp();
        self.op_immediate(opcode::LDX_CONST, Address::Const(1))?;
        self.op_memory(opcode::CPX, zero)?;
        let after = self.image.position() + 2;
        let back = (start as u8).wrapping_sub(after as u8);
        self.log(
            format!("branching back to {start:02X} with distance {back:02X}"),
            Profile::Verbose,
        );
        self.op_immediate(opcode::BNE, Address::Const(back))?;

        self.land(jump, operand_at);
        Ok(())
    }

    /// Set Z when the condition holds, so `BNE` skips the body otherwise.
    fn condition(&mut self, id: NodeId) -> Result<(), CodeGenError> {
        match self.operand(id)? {
            Operand::Compare { equal: true, node } => {
                let [left, right] = self.pair(node)?;
                let (left, right) = (self.operand(left)?, self.operand(right)?);
                let left = self.to_memory(left)?;
                let right = self.to_memory(right)?;
                self.op_memory(opcode::LDX_MEM, left)?;
                self.op_memory(opcode::CPX, right)
            }
            other => {
                let value = self.to_memory(other)?;
                self.op_immediate(opcode::LDX_CONST, Address::Const(1))?;
                self.op_memory(opcode::CPX, value)
            }
        }
    }

    fn forward_branch(&mut self) -> Result<(JumpId, usize), CodeGenError> {
        let jump = JumpId(self.jumps.len());
        self.jumps.push(Jump {
            label: format!("J{}", jump.index()),
            distance: None,
        });
        self.byte(opcode::BNE)?;
        let operand_at = self.image.position();
        self.image.write(Address::Jump(jump))?;
        Ok((jump, operand_at))
    }

    /// Resolve a forward branch to land on the next byte to be written.
    fn land(&mut self, jump: JumpId, operand_at: usize) {
        let distance = (self.image.position() - operand_at - 1) as u8;
        self.log(
            format!("{} resolves to distance {distance:02X}", self.jumps[jump.index()].label),
            Profile::Verbose,
        );
        self.jumps[jump.index()].distance = Some(distance);
    }

    // ----------------------------------------------------------------------
    // Expressions
    // ----------------------------------------------------------------------

    fn operand(&self, id: NodeId) -> Result<Operand<'a>, CodeGenError> {
        let analysis = self.analysis;
        let node = analysis.ast.value(id);
        let has_children = analysis.ast.has_children(id);
        match node {
            GrammarNode::StringLiteral { text, .. } => Ok(Operand::Str(text)),
            GrammarNode::Leaf(token) => match token.kind {
                TokenKind::Digit => token
                    .lexeme
                    .parse()
                    .map(Operand::Digit)
                    .map_err(|_| malformed(node)),
                TokenKind::BoolVal => Ok(Operand::Bool(token.lexeme == "true")),
                TokenKind::Identifier => self.binding(id).map(Operand::Var),
                TokenKind::IntOp if has_children => Ok(Operand::Sum(id)),
                TokenKind::BoolOp if has_children => Ok(Operand::Compare {
                    equal: token.lexeme == "==",
                    node: id,
                }),
                _ => Err(malformed(node)),
            },
            GrammarNode::Branch(_) => Err(malformed(node)),
        }
    }

    /// Leave the value of `operand` in the accumulator.
    fn load_accumulator(&mut self, operand: Operand<'a>) -> Result<(), CodeGenError> {
        match operand {
            Operand::Digit(digit) => self.load_constant(Address::Const(digit)),
            Operand::Bool(value) => self.load_constant(Address::Const(u8::from(value))),
            Operand::Str(text) => {
                let at = self.intern(text)?;
                self.load_constant(Address::Heap(at))
            }
            Operand::Var(symbol) => {
                let temp = self.variable(symbol)?;
                self.op_memory(opcode::LDA_MEM, temp)
            }
            Operand::Sum(node) => self.sum(node).map(|_| ()),
            Operand::Compare { equal, node } => {
                let [left, right] = self.pair(node)?;
                let (left, right) = (self.operand(left)?, self.operand(right)?);
                let left = self.to_memory(left)?;
                let right = self.to_memory(right)?;
                let (unequal, equal_value) = if equal { (0, 1) } else { (1, 0) };
                self.op_memory(opcode::LDX_MEM, left)?;
                self.op_memory(opcode::CPX, right)?;
                self.load_constant(Address::Const(unequal))?;
                self.op_immediate(opcode::BNE, Address::Const(2))?;
                self.load_constant(Address::Const(equal_value))
            }
        }
    }

    /// Memory holding the value of `operand`. Variables are used in place;
    /// anything else is computed into a fresh temp.
    fn to_memory(&mut self, operand: Operand<'a>) -> Result<TempId, CodeGenError> {
        match operand {
            Operand::Var(symbol) => self.variable(symbol),
            Operand::Sum(node) => self.sum(node),
            other => {
                let temp = self.new_temp(None);
                self.load_accumulator(other)?;
                self.store(temp)?;
                Ok(temp)
            }
        }
    }

    /// Fold a chain of additions left to right into a fresh temp. The sum
    /// is left both in that temp and in the accumulator.
    fn sum(&mut self, node: NodeId) -> Result<TempId, CodeGenError> {
        let mut terms = Vec::new();
        self.collect_terms(node, &mut terms)?;
        let Some((first, rest)) = terms.split_first() else {
            return Err(malformed(self.analysis.ast.value(node)));
        };

        let total = self.new_temp(None);
        self.load_accumulator(*first)?;
        self.store(total)?;
        for term in rest {
            self.load_accumulator(*term)?;
            self.op_memory(opcode::ADC, total)?;
            self.store(total)?;
        }
        Ok(total)
    }

    fn collect_terms(
        &self,
        node: NodeId,
        terms: &mut Vec<Operand<'a>>,
    ) -> Result<(), CodeGenError> {
        for &child in self.analysis.ast.children(node) {
            match self.operand(child)? {
                Operand::Sum(inner) => self.collect_terms(inner, terms)?,
                term => terms.push(term),
            }
        }
        Ok(())
    }

    // ----------------------------------------------------------------------
    // Emission helpers
    // ----------------------------------------------------------------------

    fn byte(&mut self, byte: u8) -> Result<(), CodeGenError> {
        self.image.write(Address::Const(byte))
    }

    fn op_immediate(&mut self, op: u8, value: Address) -> Result<(), CodeGenError> {
        self.log(format!("{op:02X} {value}"), Profile::Everything);
        self.byte(op)?;
        self.image.write(value)
    }

    fn op_memory(&mut self, op: u8, temp: TempId) -> Result<(), CodeGenError> {
        self.log(format!("{op:02X} T{} 00", temp.index()), Profile::Everything);
        self.byte(op)?;
        self.image.write(Address::Temp(temp))?;
        self.byte(0)
    }

    fn load_constant(&mut self, value: Address) -> Result<(), CodeGenError> {
        self.op_immediate(opcode::LDA_CONST, value)
    }

    fn store(&mut self, temp: TempId) -> Result<(), CodeGenError> {
        self.op_memory(opcode::STA, temp)
    }

    fn system_call(&mut self, kind: u8) -> Result<(), CodeGenError> {
        self.op_immediate(opcode::LDX_CONST, Address::Const(kind))?;
        self.byte(opcode::SYS)
    }

    fn intern(&mut self, text: &str) -> Result<u8, CodeGenError> {
        if let Some(at) = self.strings.get(text) {
            return Ok(*at);
        }
        let at = self.image.allocate_string(text)?;
        self.log(
            format!("placed string \"{text}\" on the heap at {at:02X}"),
            Profile::Verbose,
        );
        self.strings.insert(text.to_string(), at);
        Ok(at)
    }

    fn new_temp(&mut self, symbol: Option<SymbolId>) -> TempId {
        let id = TempId(self.temps.len());
        self.temps.push(Temp {
            symbol,
            register: id.index(),
            size: 1,
            address: None,
        });
        id
    }

    fn zero_temp(&mut self) -> TempId {
        match self.zero {
            Some(temp) => temp,
            None => {
                let temp = self.new_temp(None);
                self.zero = Some(temp);
                temp
            }
        }
    }

    fn variable(&self, symbol: SymbolId) -> Result<TempId, CodeGenError> {
        self.variables
            .get(&symbol)
            .copied()
            .ok_or_else(|| CodeGenError::UnresolvedSymbol {
                name: self.analysis.scopes.symbol(symbol).name.clone(),
            })
    }

    fn binding(&self, id: NodeId) -> Result<SymbolId, CodeGenError> {
        self.analysis
            .symbol_of(id)
            .ok_or_else(|| CodeGenError::UnresolvedSymbol {
                name: self.analysis.ast.value(id).to_string(),
            })
    }

    fn pair(&self, id: NodeId) -> Result<[NodeId; 2], CodeGenError> {
        match self.analysis.ast.children(id) {
            &[first, second] => Ok([first, second]),
            _ => Err(malformed(self.analysis.ast.value(id))),
        }
    }

    // ----------------------------------------------------------------------
    // Backpatching
    // ----------------------------------------------------------------------

    /// Give every temp its address, starting right after the code.
    fn layout_temps(&mut self, code_len: usize) -> Result<usize, CodeGenError> {
        let mut next = code_len;
        for temp in &mut self.temps {
            if next + temp.size > self.image.heap_start() {
                return Err(CodeGenError::OutOfMemory { limit: IMAGE_SIZE });
            }
            temp.address = Some(next as u8);
            next += temp.size;
        }
        for temp in &self.temps {
            let owner = match temp.symbol {
                Some(symbol) => self.analysis.scopes.symbol(symbol).name.clone(),
                None => "intermediate".to_string(),
            };
            self.sink.emit(
                Event::new(
                    Phase::CodeGen,
                    Severity::Message,
                    format!(
                        "T{} ({owner}) -> {:02X}",
                        temp.register,
                        temp.address.unwrap_or_default()
                    ),
                )
                .profile(Profile::Verbose),
            );
        }
        Ok(next - code_len)
    }

    fn backpatch(&mut self) -> Result<[u8; IMAGE_SIZE], CodeGenError> {
        let mut bytes = [0u8; IMAGE_SIZE];
        for (at, cell) in self.image.cells().iter().enumerate() {
            bytes[at] = match *cell {
                Address::Const(byte) | Address::Heap(byte) => byte,
                Address::Temp(temp) => self.temps[temp.index()]
                    .address
                    .ok_or_else(|| CodeGenError::MalformedAst {
                        node: format!("T{}", temp.index()),
                    })?,
                Address::Jump(jump) => {
                    let entry = &self.jumps[jump.index()];
                    entry.distance.ok_or_else(|| CodeGenError::MalformedAst {
                        node: entry.label.clone(),
                    })?
                }
            };
        }
        for (at, byte) in bytes.iter().enumerate() {
            if self.image.cells()[at].is_placeholder() {
                self.image.set(at, Address::Const(*byte));
            }
        }
        Ok(bytes)
    }

    fn log(&mut self, text: impl Into<String>, profile: Profile) {
        self.sink
            .emit(Event::new(Phase::CodeGen, Severity::Message, text).profile(profile));
    }
}

fn bool_text(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn malformed(node: &GrammarNode) -> CodeGenError {
    CodeGenError::MalformedAst {
        node: node.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::machine::{Instruction, MachineConfig, decode, run};
    use crate::parser::parse;
    use crate::semantic::analyze;

    fn build(source: &str) -> (Result<Executable, CodeGenError>, Vec<Event>) {
        let mut events: Vec<Event> = Vec::new();
        let tokens = lex(source, &mut events).expect("lex");
        let cst = parse(&tokens, &mut events).expect("parse");
        let analysis = analyze(&cst, &mut events).expect("analysis");
        let result = generate(&analysis, &mut events);
        (result, events)
    }

    fn output(source: &str) -> String {
        let (result, _) = build(source);
        let executable = result.expect("codegen");
        run(&executable.bytes, &MachineConfig::default())
            .expect("run")
            .output
    }

    #[test]
    fn declaration_zeroes_its_temp() {
        let (result, _) = build("{ int a }$");
        let exe = result.expect("codegen");
        // LDA #0; STA T0; BRK; T0 lives right after the code.
        assert_eq!(&exe.bytes[..6], &[0xA9, 0x00, 0x8D, 0x06, 0x00, 0x00]);
        assert_eq!(exe.code_len, 6);
        assert_eq!(exe.static_len, 1);
    }

    #[test]
    fn first_literal_sits_directly_under_the_top() {
        let (result, _) = build("{ print(\"abc\") }$");
        let exe = result.expect("codegen");
        assert_eq!(exe.heap_start, IMAGE_SIZE - 4);
        assert_eq!(&exe.bytes[IMAGE_SIZE - 4..], b"abc\0");
        // The print loads the literal's address into Y.
        assert_eq!(&exe.bytes[..2], &[0xA0, (IMAGE_SIZE - 4) as u8]);
    }

    #[test]
    fn string_declaration_points_at_an_empty_literal() {
        let (result, _) = build("{ string s s = \"abc\" print(s) }$");
        let exe = result.expect("codegen");
        // "" takes the top cell, "abc" sits below it.
        assert_eq!(exe.bytes[IMAGE_SIZE - 1], 0);
        assert_eq!(&exe.bytes[IMAGE_SIZE - 5..IMAGE_SIZE - 1], b"abc\0");
        assert_eq!(&exe.bytes[..2], &[0xA9, (IMAGE_SIZE - 1) as u8]);
        assert_eq!(&exe.bytes[5..7], &[0xA9, (IMAGE_SIZE - 5) as u8]);
    }

    #[test]
    fn unassigned_string_prints_nothing() {
        assert_eq!(output("{ string s print(s) }$"), "");
        assert_eq!(output("{ string s print(s) s = \"ok\" print(s) }$"), "ok");
    }

    #[test]
    fn identical_literals_share_storage() {
        let (result, _) = build("{ print(\"ab\") print(\"ab\") }$");
        let exe = result.expect("codegen");
        assert_eq!(exe.heap_start, IMAGE_SIZE - 3);
    }

    #[test]
    fn loop_exit_lands_after_the_back_branch() {
        let (result, _) = build("{ int a while (a == 1) { int b } }$");
        let exe = result.expect("codegen");
        let listing = decode(&exe.bytes).expect("decode");
        let branches: Vec<(usize, u8)> = listing
            .iter()
            .filter_map(|(at, ins)| match ins {
                Instruction::Bne(d) => Some((*at, *d)),
                _ => None,
            })
            .collect();
        assert_eq!(branches.len(), 2);

        let (exit_at, exit_distance) = branches[0];
        let (back_at, back_distance) = branches[1];
        let exit_target = exit_at + 2 + exit_distance as usize;
        assert_eq!(exit_target, back_at + 2);
        assert_eq!(listing.last(), Some(&(exit_target, Instruction::Brk)));

        let back_target = (back_at + 2 + back_distance as usize) % IMAGE_SIZE;
        // The loop restarts at the condition, right after `int a`.
        assert_eq!(back_target, 5);
    }

    #[test]
    fn counts_in_a_loop() {
        assert_eq!(
            output("{ int a a = 0 while (a != 3) { a = 1 + a print(a) } }$"),
            "123"
        );
    }

    #[test]
    fn evaluates_sums() {
        assert_eq!(output("{ print(1 + 2 + 3) }$"), "6");
        assert_eq!(output("{ int a a = 4 int b b = 2 + a print(b) }$"), "6");
    }

    #[test]
    fn prints_strings_and_booleans() {
        assert_eq!(output("{ string s s = \"hi\" print(s) }$"), "hi");
        assert_eq!(output("{ print((1 == 1)) print(false) }$"), "truefalse");
        assert_eq!(
            output("{ boolean b b = (2 != 2) print(b) b = true print(b) }$"),
            "falsetrue"
        );
    }

    #[test]
    fn branches_on_conditions() {
        assert_eq!(
            output("{ int a a = 2 if (a == 2) { print(\"yes\") } if (a != 2) { print(\"no\") } }$"),
            "yes"
        );
        assert_eq!(output("{ if true { print(1) } if false { print(2) } }$"), "1");
        assert_eq!(
            output("{ boolean b b = (1 == 2) if (b == true) { print(1) } if (b == false) { print(2) } }$"),
            "2"
        );
    }

    #[test]
    fn shadowed_variables_get_their_own_storage() {
        assert_eq!(output("{ int a a = 1 { int a a = 2 print(a) } print(a) }$"), "21");
    }

    #[test]
    fn warnings_do_not_block_generation() {
        let (result, events) = build("{ int a print(a) int b }$");
        assert!(result.is_ok());
        assert_eq!(events.iter().filter(|e| e.is_warning()).count(), 2);
    }

    #[test]
    fn generation_is_repeatable() {
        let source = "{ int a a = 1 + 2 while (a != 5) { a = 1 + a } print(a) }$";
        let (first, _) = build(source);
        let (second, _) = build(source);
        assert_eq!(first.expect("first"), second.expect("second"));
    }

    #[test]
    fn reports_heap_collision() {
        let source = format!("{{ string s s = \"{}\" }}$", "a".repeat(250));
        let (result, _) = build(&source);
        assert_eq!(result, Err(CodeGenError::OutOfMemory { limit: IMAGE_SIZE }));
    }
}
