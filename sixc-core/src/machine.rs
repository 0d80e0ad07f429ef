//! A small simulator for the 6502 subset the code generator emits.
//!
//! Memory is the 256-byte image itself, so code, temps and strings share one
//! address space. Only `CPX` touches the zero flag. `BNE` takes a signed
//! one-byte distance relative to the address after its operand, which in a
//! 256-byte space is the same as adding modulo 256. `SYS` prints: `X = 1`
//! writes `Y` as a decimal integer, `X = 2` writes the zero-terminated
//! string starting at `Y`.

use core::fmt;

use thiserror::Error;

use crate::image::IMAGE_SIZE;

pub mod opcode {
    pub const LDA_CONST: u8 = 0xA9;
    pub const LDA_MEM: u8 = 0xAD;
    pub const STA: u8 = 0x8D;
    pub const ADC: u8 = 0x6D;
    pub const LDX_CONST: u8 = 0xA2;
    pub const LDX_MEM: u8 = 0xAE;
    pub const LDY_CONST: u8 = 0xA0;
    pub const LDY_MEM: u8 = 0xAC;
    pub const CPX: u8 = 0xEC;
    pub const BNE: u8 = 0xD0;
    pub const INC: u8 = 0xEE;
    pub const NOP: u8 = 0xEA;
    pub const BRK: u8 = 0x00;
    pub const SYS: u8 = 0xFF;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    pub step_limit: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig { step_limit: 10_000 }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MachineError {
    #[error("unknown opcode {opcode:02X} at {offset:02X}")]
    UnknownOpcode { opcode: u8, offset: usize },
    #[error("address {address:04X} at {offset:02X} is outside the image")]
    AddressOutOfRange { address: u16, offset: usize },
    #[error("unknown system call X={x:02X}")]
    UnknownSystemCall { x: u8 },
    #[error("program did not halt within {limit} steps")]
    StepLimit { limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    LdaConst(u8),
    LdaMem(u8),
    Sta(u8),
    Adc(u8),
    LdxConst(u8),
    LdxMem(u8),
    LdyConst(u8),
    LdyMem(u8),
    Cpx(u8),
    Bne(u8),
    Inc(u8),
    Nop,
    Brk,
    Sys,
}

impl Instruction {
    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        match self {
            Instruction::Nop | Instruction::Brk | Instruction::Sys => 1,
            Instruction::LdaConst(_)
            | Instruction::LdxConst(_)
            | Instruction::LdyConst(_)
            | Instruction::Bne(_) => 2,
            _ => 3,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::LdaConst(v) => write!(f, "LDA #${v:02X}"),
            Instruction::LdaMem(a) => write!(f, "LDA ${a:02X}"),
            Instruction::Sta(a) => write!(f, "STA ${a:02X}"),
            Instruction::Adc(a) => write!(f, "ADC ${a:02X}"),
            Instruction::LdxConst(v) => write!(f, "LDX #${v:02X}"),
            Instruction::LdxMem(a) => write!(f, "LDX ${a:02X}"),
            Instruction::LdyConst(v) => write!(f, "LDY #${v:02X}"),
            Instruction::LdyMem(a) => write!(f, "LDY ${a:02X}"),
            Instruction::Cpx(a) => write!(f, "CPX ${a:02X}"),
            Instruction::Bne(d) => write!(f, "BNE ${d:02X}"),
            Instruction::Inc(a) => write!(f, "INC ${a:02X}"),
            Instruction::Nop => f.write_str("NOP"),
            Instruction::Brk => f.write_str("BRK"),
            Instruction::Sys => f.write_str("SYS"),
        }
    }
}

fn byte_at(memory: &[u8], at: usize) -> u8 {
    memory[at % IMAGE_SIZE]
}

/// Read a little-endian absolute operand. The high byte must be zero.
fn address_at(memory: &[u8], offset: usize) -> Result<u8, MachineError> {
    let low = byte_at(memory, offset + 1);
    let high = byte_at(memory, offset + 2);
    if high != 0 {
        return Err(MachineError::AddressOutOfRange {
            address: u16::from_le_bytes([low, high]),
            offset,
        });
    }
    Ok(low)
}

pub fn decode_at(memory: &[u8], offset: usize) -> Result<Instruction, MachineError> {
    use opcode::*;

    let opcode = byte_at(memory, offset);
    let immediate = || byte_at(memory, offset + 1);
    Ok(match opcode {
        LDA_CONST => Instruction::LdaConst(immediate()),
        LDA_MEM => Instruction::LdaMem(address_at(memory, offset)?),
        STA => Instruction::Sta(address_at(memory, offset)?),
        ADC => Instruction::Adc(address_at(memory, offset)?),
        LDX_CONST => Instruction::LdxConst(immediate()),
        LDX_MEM => Instruction::LdxMem(address_at(memory, offset)?),
        LDY_CONST => Instruction::LdyConst(immediate()),
        LDY_MEM => Instruction::LdyMem(address_at(memory, offset)?),
        CPX => Instruction::Cpx(address_at(memory, offset)?),
        BNE => Instruction::Bne(immediate()),
        INC => Instruction::Inc(address_at(memory, offset)?),
        NOP => Instruction::Nop,
        BRK => Instruction::Brk,
        SYS => Instruction::Sys,
        _ => return Err(MachineError::UnknownOpcode { opcode, offset }),
    })
}

/// Linear disassembly from address 0 up to and including the first `BRK`.
pub fn decode(memory: &[u8]) -> Result<Vec<(usize, Instruction)>, MachineError> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset < memory.len() {
        let instruction = decode_at(memory, offset)?;
        out.push((offset, instruction));
        if instruction == Instruction::Brk {
            break;
        }
        offset += instruction.size();
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub output: String,
    pub steps: usize,
}

#[derive(Debug, Clone)]
pub struct Machine {
    memory: [u8; IMAGE_SIZE],
    pc: usize,
    a: u8,
    x: u8,
    y: u8,
    zero: bool,
    output: String,
    steps: usize,
}

impl Machine {
    pub fn new(image: &[u8; IMAGE_SIZE]) -> Self {
        Machine {
            memory: *image,
            pc: 0,
            a: 0,
            x: 0,
            y: 0,
            zero: false,
            output: String::new(),
            steps: 0,
        }
    }

    pub fn memory(&self) -> &[u8; IMAGE_SIZE] {
        &self.memory
    }

    /// Execute one instruction. Returns `false` once the machine halted.
    pub fn step(&mut self) -> Result<bool, MachineError> {
        let instruction = decode_at(&self.memory, self.pc)?;
        self.steps += 1;
        self.pc = (self.pc + instruction.size()) % IMAGE_SIZE;

        match instruction {
            Instruction::LdaConst(v) => self.a = v,
            Instruction::LdaMem(addr) => self.a = self.memory[addr as usize],
            Instruction::Sta(addr) => self.memory[addr as usize] = self.a,
            Instruction::Adc(addr) => self.a = self.a.wrapping_add(self.memory[addr as usize]),
            Instruction::LdxConst(v) => self.x = v,
            Instruction::LdxMem(addr) => self.x = self.memory[addr as usize],
            Instruction::LdyConst(v) => self.y = v,
            Instruction::LdyMem(addr) => self.y = self.memory[addr as usize],
            Instruction::Cpx(addr) => self.zero = self.x == self.memory[addr as usize],
            Instruction::Bne(distance) => {
                if !self.zero {
                    self.pc = (self.pc + distance as usize) % IMAGE_SIZE;
                }
            }
            Instruction::Inc(addr) => {
                let cell = &mut self.memory[addr as usize];
                *cell = cell.wrapping_add(1);
            }
            Instruction::Nop => {}
            Instruction::Brk => return Ok(false),
            Instruction::Sys => self.system_call()?,
        }
        Ok(true)
    }

    fn system_call(&mut self) -> Result<(), MachineError> {
        match self.x {
            1 => self.output.push_str(&self.y.to_string()),
            2 => {
                let mut at = self.y as usize;
                // A string without terminator stops at the end of memory.
                while at < IMAGE_SIZE && self.memory[at] != 0 {
                    self.output.push(char::from(self.memory[at]));
                    at += 1;
                }
            }
            x => return Err(MachineError::UnknownSystemCall { x }),
        }
        Ok(())
    }

    pub fn run(mut self, config: &MachineConfig) -> Result<RunOutcome, MachineError> {
        loop {
            if self.steps >= config.step_limit {
                return Err(MachineError::StepLimit {
                    limit: config.step_limit,
                });
            }
            if !self.step()? {
                break;
            }
        }
        Ok(RunOutcome {
            output: self.output,
            steps: self.steps,
        })
    }
}

pub fn run(image: &[u8; IMAGE_SIZE], config: &MachineConfig) -> Result<RunOutcome, MachineError> {
    Machine::new(image).run(config)
}
