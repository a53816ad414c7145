//! Soft CPU control and debug interface
//!
//! The core exposes a control word (RUN/RESET/STEP), its program counter, a
//! status word, two small memories mapped into the register window and four
//! read-only debug telemetry registers that record the last memory write the
//! core saw on its bus.

use std::time::Duration;

use super::regs::{self, ctrl_bits};
use crate::config::PeriphConfig;
use crate::error::{PeriphError, Region, Result};
use crate::wait::settle;
use crate::window::RegisterAccess;

#[cfg(unix)]
use crate::window::RegisterWindow;

/// Debug telemetry, as last updated by the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuDebugState {
    /// Window offset of the last memory write
    pub last_addr: u32,
    /// Value of the last memory write
    pub last_data: u32,
    /// Cumulative number of memory writes
    pub write_count: u32,
    /// Implementation-defined execution state code
    pub state: u32,
}

/// Which of the two CPU memories an index refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Memory {
    Instruction,
    Data,
}

impl Memory {
    fn base(self) -> usize {
        match self {
            Memory::Instruction => regs::INSTR_BASE,
            Memory::Data => regs::DATA_BASE,
        }
    }

    fn region(self) -> Region {
        match self {
            Memory::Instruction => Region::InstructionMemory,
            Memory::Data => Region::DataMemory,
        }
    }
}

/// Soft CPU core behind a register window
pub struct CpuDevice<A: RegisterAccess> {
    bus: A,
    instr_words: usize,
    data_words: usize,
    reset_hold: Duration,
}

impl<A: RegisterAccess> CpuDevice<A> {
    pub fn new(bus: A, config: &PeriphConfig) -> Self {
        Self {
            bus,
            instr_words: config.cpu.instr_words,
            data_words: config.cpu.data_words,
            reset_hold: config.timing.reset_hold(),
        }
    }

    /// Pulse RESET: assert, hold, deassert
    pub fn reset(&mut self) -> Result<()> {
        log::debug!("CPU reset (hold {:?})", self.reset_hold);
        self.bus.write32(regs::CTRL, ctrl_bits::RESET)?;
        settle(self.reset_hold);
        self.bus.write32(regs::CTRL, 0)
    }

    /// Set the RUN bit
    pub fn run(&mut self) -> Result<()> {
        log::debug!("CPU run");
        let ctrl = self.control()?;
        self.bus.write32(regs::CTRL, ctrl | ctrl_bits::RUN)
    }

    /// Clear the RUN bit
    pub fn stop(&mut self) -> Result<()> {
        log::debug!("CPU stop");
        let ctrl = self.control()?;
        self.bus.write32(regs::CTRL, ctrl & !ctrl_bits::RUN)
    }

    /// Pulse STEP to execute a single instruction
    pub fn step(&mut self) -> Result<()> {
        let ctrl = self.control()? & !ctrl_bits::STEP;
        self.bus.write32(regs::CTRL, ctrl | ctrl_bits::STEP)?;
        self.bus.write32(regs::CTRL, ctrl)
    }

    /// Current control word
    pub fn control(&mut self) -> Result<u32> {
        self.bus.read32(regs::CTRL)
    }

    pub fn set_pc(&mut self, pc: u32) -> Result<()> {
        self.bus.write32(regs::PC, pc)
    }

    pub fn get_pc(&mut self) -> Result<u32> {
        self.bus.read32(regs::PC)
    }

    /// Opaque status word; nonzero means something happened
    pub fn get_status(&mut self) -> Result<u32> {
        self.bus.read32(regs::STATUS)
    }

    /// Register readback port
    pub fn register(&mut self) -> Result<u32> {
        self.bus.read32(regs::REG)
    }

    fn memory_words(&self, memory: Memory) -> usize {
        match memory {
            Memory::Instruction => self.instr_words,
            Memory::Data => self.data_words,
        }
    }

    fn out_of_range(&self, memory: Memory, index: usize) -> PeriphError {
        PeriphError::OutOfRange {
            region: memory.region(),
            index,
            limit: self.memory_words(memory),
        }
    }

    fn word_offset(&self, memory: Memory, index: usize) -> Result<usize> {
        if index >= self.memory_words(memory) {
            return Err(self.out_of_range(memory, index));
        }
        index
            .checked_mul(4)
            .and_then(|bytes| bytes.checked_add(memory.base()))
            .ok_or_else(|| self.out_of_range(memory, index))
    }

    pub fn write_word(&mut self, memory: Memory, index: usize, word: u32) -> Result<()> {
        let offset = self.word_offset(memory, index)?;
        self.bus.write32(offset, word)
    }

    pub fn read_word(&mut self, memory: Memory, index: usize) -> Result<u32> {
        let offset = self.word_offset(memory, index)?;
        self.bus.read32(offset)
    }

    pub fn write_instruction(&mut self, index: usize, word: u32) -> Result<()> {
        self.write_word(Memory::Instruction, index, word)
    }

    pub fn read_instruction(&mut self, index: usize) -> Result<u32> {
        self.read_word(Memory::Instruction, index)
    }

    pub fn write_data(&mut self, index: usize, word: u32) -> Result<()> {
        self.write_word(Memory::Data, index, word)
    }

    pub fn read_data(&mut self, index: usize) -> Result<u32> {
        self.read_word(Memory::Data, index)
    }

    /// Load a program at instruction index 0
    ///
    /// Checked up front, so an oversized program writes nothing.
    pub fn load_program(&mut self, words: &[u32]) -> Result<()> {
        self.load(Memory::Instruction, 0, words)
    }

    /// Load data words starting at `start`
    pub fn load_data(&mut self, start: usize, words: &[u32]) -> Result<()> {
        self.load(Memory::Data, start, words)
    }

    fn load(&mut self, memory: Memory, start: usize, words: &[u32]) -> Result<()> {
        let end = start
            .checked_add(words.len())
            .ok_or_else(|| self.out_of_range(memory, start))?;
        if let Some(last) = end.checked_sub(1) {
            self.word_offset(memory, last)?;
        }
        log::debug!("Loading {} words into {:?} memory at {}", words.len(), memory, start);
        for (i, &word) in words.iter().enumerate() {
            self.write_word(memory, start + i, word)?;
        }
        Ok(())
    }

    /// Read the four debug telemetry registers
    pub fn get_debug_state(&mut self) -> Result<CpuDebugState> {
        Ok(CpuDebugState {
            last_addr: self.bus.read32(regs::DEBUG_LAST_ADDR)?,
            last_data: self.bus.read32(regs::DEBUG_LAST_DATA)?,
            write_count: self.bus.read32(regs::DEBUG_WRITE_CNT)?,
            state: self.bus.read32(regs::DEBUG_STATE)?,
        })
    }

    pub fn instr_words(&self) -> usize {
        self.instr_words
    }

    pub fn data_words(&self) -> usize {
        self.data_words
    }

    /// Raw register access, for diagnostics
    pub fn bus_mut(&mut self) -> &mut A {
        &mut self.bus
    }

    pub fn into_inner(self) -> A {
        self.bus
    }
}

#[cfg(unix)]
impl CpuDevice<RegisterWindow> {
    /// Map the CPU window described by `config`
    pub fn open(config: &PeriphConfig) -> Result<Self> {
        let window =
            RegisterWindow::open_device(&config.mem_device, config.cpu_base, config.map_len)?;
        Ok(Self::new(window, config))
    }

    /// Unmap the CPU window
    pub fn close(&mut self) -> Result<()> {
        self.bus.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;
    use crate::sim::SimCpu;

    fn make_cpu() -> CpuDevice<SimCpu> {
        let config = PeriphConfig::default().with_timing(TimingConfig::immediate());
        CpuDevice::new(SimCpu::new(0x10000), &config)
    }

    #[test]
    fn test_reset_is_a_pulse() {
        let mut cpu = make_cpu();
        cpu.reset().unwrap();
        let writes = cpu.bus_mut().take_writes();
        assert_eq!(writes, vec![(regs::CTRL, ctrl_bits::RESET), (regs::CTRL, 0)]);
        assert_eq!(cpu.control().unwrap(), 0);
    }

    #[test]
    fn test_reset_zeroes_pc() {
        let mut cpu = make_cpu();
        cpu.set_pc(0x100).unwrap();
        cpu.reset().unwrap();
        assert_eq!(cpu.get_pc().unwrap(), 0);
    }

    #[test]
    fn test_pc_round_trip() {
        let mut cpu = make_cpu();
        cpu.set_pc(0x100).unwrap();
        assert_eq!(cpu.get_pc().unwrap(), 0x100);
    }

    #[test]
    fn test_run_and_stop_toggle_only_run_bit() {
        let mut cpu = make_cpu();
        cpu.bus_mut().write32(regs::CTRL, 0x8).unwrap();
        cpu.run().unwrap();
        assert_eq!(cpu.control().unwrap(), 0x8 | ctrl_bits::RUN);
        cpu.stop().unwrap();
        assert_eq!(cpu.control().unwrap(), 0x8);
    }

    #[test]
    fn test_step_pulses_step_bit() {
        let mut cpu = make_cpu();
        cpu.step().unwrap();
        let writes = cpu.bus_mut().take_writes();
        assert_eq!(writes, vec![(regs::CTRL, ctrl_bits::STEP), (regs::CTRL, 0)]);
    }

    #[test]
    fn test_instruction_offsets() {
        let mut cpu = make_cpu();
        cpu.write_instruction(2, 0x002081B3).unwrap();
        assert_eq!(cpu.bus_mut().take_writes(), vec![(0x48, 0x002081B3)]);
        assert_eq!(cpu.read_instruction(2).unwrap(), 0x002081B3);
    }

    #[test]
    fn test_data_offsets() {
        let mut cpu = make_cpu();
        cpu.write_data(3, 0xABCDEF00).unwrap();
        assert_eq!(cpu.bus_mut().take_writes(), vec![(0x8C, 0xABCDEF00)]);
        assert_eq!(cpu.read_data(3).unwrap(), 0xABCDEF00);
    }

    #[test]
    fn test_instruction_index_out_of_range() {
        let mut cpu = make_cpu();
        let err = cpu.write_instruction(16, 0).unwrap_err();
        assert!(matches!(
            err,
            PeriphError::OutOfRange { region: Region::InstructionMemory, index: 16, limit: 16 }
        ));
        assert!(cpu.bus_mut().take_writes().is_empty());
    }

    #[test]
    fn test_data_index_out_of_range() {
        let mut cpu = make_cpu();
        assert!(matches!(
            cpu.read_data(16),
            Err(PeriphError::OutOfRange { region: Region::DataMemory, .. })
        ));
    }

    #[test]
    fn test_oversized_program_writes_nothing() {
        let mut cpu = make_cpu();
        let program = vec![regs::NOP; 17];
        assert!(cpu.load_program(&program).is_err());
        assert!(cpu.bus_mut().take_writes().is_empty());
    }

    #[test]
    fn test_load_at_end_of_address_space() {
        let mut cpu = make_cpu();
        assert!(matches!(
            cpu.load_data(usize::MAX, &[1]),
            Err(PeriphError::OutOfRange {
                region: Region::DataMemory,
                index: usize::MAX,
                limit: 16
            })
        ));
        assert!(matches!(
            cpu.load_data(usize::MAX - 1, &[1, 2, 3]),
            Err(PeriphError::OutOfRange { region: Region::DataMemory, .. })
        ));
        assert!(cpu.bus_mut().take_writes().is_empty());
    }

    #[test]
    fn test_unvalidated_memory_size_does_not_overflow() {
        let mut config = PeriphConfig::default().with_timing(TimingConfig::immediate());
        config.cpu.data_words = usize::MAX;
        let mut cpu = CpuDevice::new(SimCpu::new(0x10000), &config);
        assert!(matches!(
            cpu.write_data(usize::MAX / 2, 0),
            Err(PeriphError::OutOfRange { region: Region::DataMemory, .. })
        ));
    }

    #[test]
    fn test_load_data_at_offset() {
        let mut cpu = make_cpu();
        cpu.load_data(4, &[0xDEADBEEF, 0xCAFEBABE]).unwrap();
        assert_eq!(cpu.read_data(4).unwrap(), 0xDEADBEEF);
        assert_eq!(cpu.read_data(5).unwrap(), 0xCAFEBABE);
        cpu.load_data(16, &[]).unwrap();
    }

    #[test]
    fn test_debug_state_tracks_writes() {
        let mut cpu = make_cpu();
        let before = cpu.get_debug_state().unwrap();
        cpu.write_instruction(0, 0xAAAAAAAA).unwrap();
        cpu.write_instruction(1, 0xBBBBBBBB).unwrap();
        cpu.write_instruction(2, 0xCCCCCCCC).unwrap();
        let after = cpu.get_debug_state().unwrap();
        assert_eq!(after.last_addr, 0x48);
        assert_eq!(after.last_data, 0xCCCCCCCC);
        assert_eq!(after.write_count, before.write_count + 3);
    }
}
