//! The 256-byte execution image and its cell model.
//!
//! Code grows upward from address 0. String literals grow downward from the
//! top of the image, each followed by a zero terminator. While code is being
//! emitted, operands whose value is not known yet are stored as symbolic
//! [`Address`] placeholders and resolved by the generator's backpatch pass.

use core::fmt::{self, Write as _};

use crate::error::CodeGenError;

pub const IMAGE_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TempId(pub(crate) usize);

impl TempId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JumpId(pub(crate) usize);

impl JumpId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Content of one image cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    /// An opcode or a known constant byte.
    Const(u8),
    /// Start offset of a string literal in the heap region.
    Heap(u8),
    /// Low byte of a temp's address, resolved after emission.
    Temp(TempId),
    /// Branch distance, resolved once the branch target is emitted.
    Jump(JumpId),
}

impl Address {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Address::Temp(_) | Address::Jump(_))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Const(byte) | Address::Heap(byte) => write!(f, "{byte:02X}"),
            Address::Temp(id) => write!(f, "T{}", id.0),
            Address::Jump(id) => write!(f, "J{}", id.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionImage {
    cells: [Address; IMAGE_SIZE],
    /// Next code cell to write.
    index: usize,
    /// Cell that receives the terminator of the next string literal.
    /// Only ever decreases.
    heap_index: usize,
}

impl Default for ExecutionImage {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionImage {
    pub fn new() -> Self {
        ExecutionImage {
            cells: [Address::Const(0); IMAGE_SIZE],
            index: 0,
            heap_index: IMAGE_SIZE - 1,
        }
    }

    pub fn position(&self) -> usize {
        self.index
    }

    /// Lowest address occupied by string data.
    pub fn heap_start(&self) -> usize {
        self.heap_index + 1
    }

    pub fn cells(&self) -> &[Address] {
        &self.cells
    }

    pub fn write(&mut self, cell: Address) -> Result<(), CodeGenError> {
        if self.index > self.heap_index {
            return Err(CodeGenError::OutOfMemory { limit: IMAGE_SIZE });
        }
        self.cells[self.index] = cell;
        self.index += 1;
        Ok(())
    }

    pub fn set(&mut self, at: usize, cell: Address) {
        self.cells[at] = cell;
    }

    /// Place a string literal at the top of the free region and return its
    /// start offset. The byte after the text stays zero as the terminator.
    pub fn allocate_string(&mut self, text: &str) -> Result<u8, CodeGenError> {
        let bytes = text.as_bytes();
        let start = self
            .heap_index
            .checked_sub(bytes.len())
            .filter(|start| *start >= self.index && *start > 0)
            .ok_or(CodeGenError::OutOfMemory { limit: IMAGE_SIZE })?;
        for (offset, byte) in bytes.iter().enumerate() {
            self.cells[start + offset] = Address::Const(*byte);
        }
        self.cells[self.heap_index] = Address::Const(0);
        self.heap_index = start - 1;
        Ok(start as u8)
    }

    /// Placeholder-style rendering, useful before backpatching.
    pub fn render(&self) -> String {
        let cells: Vec<String> = self.cells.iter().map(ToString::to_string).collect();
        cells.join(" ")
    }
}

/// A fully resolved image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    pub bytes: [u8; IMAGE_SIZE],
    /// Number of code bytes, including the final break.
    pub code_len: usize,
    /// Bytes reserved for temps directly after the code.
    pub static_len: usize,
    pub heap_start: usize,
}

impl Executable {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// All bytes as space separated hex pairs.
    pub fn to_hex(&self) -> String {
        let pairs: Vec<String> = self.bytes.iter().map(|b| format!("{b:02X}")).collect();
        pairs.join(" ")
    }

    /// Sixteen bytes per row, each row prefixed with its offset.
    pub fn hex_dump(&self) -> String {
        let mut out = String::new();
        for (row, chunk) in self.bytes.chunks(16).enumerate() {
            let pairs: Vec<String> = chunk.iter().map(|b| format!("{b:02X}")).collect();
            let _ = writeln!(out, "{:02X}: {}", row * 16, pairs.join(" "));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_grow_down_from_the_top() {
        let mut image = ExecutionImage::new();
        let first = image.allocate_string("abc").expect("fits");
        assert_eq!(first as usize, IMAGE_SIZE - 4);
        assert_eq!(image.heap_start(), IMAGE_SIZE - 4);

        let second = image.allocate_string("xy").expect("fits");
        assert_eq!(second as usize, IMAGE_SIZE - 4 - 3);
        assert_eq!(image.cells()[IMAGE_SIZE - 5], Address::Const(0));
        assert_eq!(image.cells()[second as usize], Address::Const(b'x'));
    }

    #[test]
    fn empty_string_is_just_a_terminator() {
        let mut image = ExecutionImage::new();
        let at = image.allocate_string("").expect("fits");
        assert_eq!(at as usize, IMAGE_SIZE - 1);
        assert_eq!(image.heap_start(), IMAGE_SIZE - 1);
    }

    #[test]
    fn code_and_heap_may_not_collide() {
        let mut image = ExecutionImage::new();
        let text = "a".repeat(250);
        image.allocate_string(&text).expect("fits");
        for _ in 0..5 {
            image.write(Address::Const(0xEA)).expect("fits");
        }
        assert_eq!(
            image.write(Address::Const(0xEA)),
            Err(CodeGenError::OutOfMemory { limit: IMAGE_SIZE })
        );
    }

    #[test]
    fn renders_placeholders() {
        let mut image = ExecutionImage::new();
        image.write(Address::Const(0x8D)).expect("fits");
        image.write(Address::Temp(TempId(0))).expect("fits");
        image.write(Address::Const(0)).expect("fits");
        image.write(Address::Jump(JumpId(1))).expect("fits");
        assert!(image.render().starts_with("8D T0 00 J1 00"));
    }

    #[test]
    fn hex_dump_has_sixteen_rows() {
        let exe = Executable {
            bytes: [0xEA; IMAGE_SIZE],
            code_len: 0,
            static_len: 0,
            heap_start: IMAGE_SIZE,
        };
        let dump = exe.hex_dump();
        assert_eq!(dump.lines().count(), 16);
        assert!(dump.starts_with("00: EA EA"));
        assert!(dump.lines().last().is_some_and(|l| l.starts_with("F0: ")));
    }

    #[test]
    fn hex_line_lists_every_byte() {
        let mut bytes = [0u8; IMAGE_SIZE];
        bytes[0] = 0xA9;
        bytes[IMAGE_SIZE - 1] = 0x0F;
        let exe = Executable {
            bytes,
            code_len: 1,
            static_len: 0,
            heap_start: IMAGE_SIZE,
        };
        let hex = exe.to_hex();
        let pairs: Vec<&str> = hex.split(' ').collect();
        assert_eq!(pairs.len(), IMAGE_SIZE);
        assert_eq!(pairs[0], "A9");
        assert_eq!(pairs[IMAGE_SIZE - 1], "0F");
        assert!(!hex.contains('\n'));
    }
}
