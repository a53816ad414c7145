use crate::cpu::regs::{self, ctrl_bits};
use crate::error::Result;
use crate::window::{check_offset, RegisterAccess};

/// Execution state codes reported through DEBUG_STATE
const STATE_HALTED: u32 = 0;
const STATE_RUNNING: u32 = 1;

/// Register-level model of the soft CPU's control and debug window
#[derive(Debug, Clone)]
pub struct SimCpu {
    words: Vec<u32>,
    pc: u32,
    last_addr: u32,
    last_data: u32,
    write_count: u32,
    writes: Vec<(usize, u32)>,
}

impl SimCpu {
    /// Halted core behind a window of `window_len` bytes
    pub fn new(window_len: usize) -> Self {
        Self {
            words: vec![0; window_len / 4],
            pc: 0,
            last_addr: 0,
            last_data: 0,
            write_count: 0,
            writes: Vec::new(),
        }
    }

    /// Drain the write log
    pub fn take_writes(&mut self) -> Vec<(usize, u32)> {
        std::mem::take(&mut self.writes)
    }

    fn ctrl(&self) -> u32 {
        self.words[regs::CTRL / 4]
    }

    fn running(&self) -> bool {
        self.ctrl() & ctrl_bits::RUN != 0
    }

    fn write_ctrl(&mut self, value: u32) {
        if value & ctrl_bits::RESET != 0 {
            self.pc = 0;
        } else if value & ctrl_bits::STEP != 0 && self.ctrl() & ctrl_bits::STEP == 0 {
            self.pc = self.pc.wrapping_add(4);
        }
        self.words[regs::CTRL / 4] = value;
    }
}

impl RegisterAccess for SimCpu {
    fn read32(&mut self, offset: usize) -> Result<u32> {
        check_offset(offset, self.window_len())?;
        let value = match offset {
            regs::STATUS => self.running() as u32,
            regs::PC => {
                // Each observation of a running core finds it one instruction on
                if self.running() {
                    self.pc = self.pc.wrapping_add(4);
                }
                self.pc
            }
            regs::DEBUG_LAST_ADDR => self.last_addr,
            regs::DEBUG_LAST_DATA => self.last_data,
            regs::DEBUG_WRITE_CNT => self.write_count,
            regs::DEBUG_STATE => {
                if self.running() {
                    STATE_RUNNING
                } else {
                    STATE_HALTED
                }
            }
            _ => self.words[offset / 4],
        };
        Ok(value)
    }

    fn write32(&mut self, offset: usize, value: u32) -> Result<()> {
        check_offset(offset, self.window_len())?;
        self.writes.push((offset, value));
        match offset {
            regs::CTRL => self.write_ctrl(value),
            regs::PC => self.pc = value,
            regs::STATUS
            | regs::DEBUG_LAST_ADDR
            | regs::DEBUG_LAST_DATA
            | regs::DEBUG_WRITE_CNT
            | regs::DEBUG_STATE => {}
            _ => {
                self.words[offset / 4] = value;
                if offset >= regs::INSTR_BASE {
                    self.last_addr = offset as u32;
                    self.last_data = value;
                    self.write_count = self.write_count.wrapping_add(1);
                }
            }
        }
        Ok(())
    }

    fn window_len(&self) -> usize {
        self.words.len() * 4
    }
}
