//! Dispatches CPU loads/stores to the right device and drives the DMA
//! engine. `Bus` owns everything reachable from a memory access; nothing it
//! owns holds a pointer back to it.

use log::{debug, trace, warn};

use crate::bios::Bios;
use crate::dma::{self, Direction, DmaController, Port, Sync};
use crate::error::EmuError;
use crate::gpu::{GpuPort, NullGpu};
use crate::map::{self, mask_region};
use crate::ram::Ram;

pub struct Bus {
    ram: Ram,
    bios: Bios,
    dma: DmaController,
    gpu: NullGpu,
}

impl Bus {
    pub fn new(bios: Bios) -> Self {
        Bus { ram: Ram::new(), bios, dma: DmaController::new(), gpu: NullGpu::new() }
    }

    pub fn gpu_mut(&mut self) -> &mut NullGpu {
        &mut self.gpu
    }

    pub fn load32(&mut self, addr: u32) -> Result<u32, EmuError> {
        let abs = mask_region(addr);

        if let Some(off) = map::RAM.contains(abs) {
            return Ok(self.ram.load32(off));
        }
        if let Some(off) = map::BIOS.contains(abs) {
            return Ok(self.bios.load32(off));
        }
        if let Some(off) = map::IRQ_CONTROL.contains(abs) {
            debug!("IRQ_CONTROL read at offset {off:#x}");
            return Ok(0);
        }
        if let Some(off) = map::DMA.contains(abs) {
            return Ok(self.dma_load32(off));
        }
        if let Some(off) = map::GPU.contains(abs) {
            return Ok(if off == 4 { self.gpu.status() } else { 0 });
        }
        if let Some(off) = map::TIMERS.contains(abs) {
            debug!("TIMERS read at offset {off:#x}");
            return Ok(0);
        }

        Err(EmuError::UnmappedAddress { pc: addr, addr: abs, width: 32 })
    }

    pub fn store32(&mut self, addr: u32, val: u32) -> Result<(), EmuError> {
        let abs = mask_region(addr);

        if let Some(off) = map::RAM.contains(abs) {
            self.ram.store32(off, val);
            return Ok(());
        }
        if let Some(off) = map::MEM_CONTROL.contains(abs) {
            match off {
                0 => {
                    if val != 0x1f00_0000 {
                        warn!("bad expansion 1 base address: {val:#010x}");
                    }
                }
                4 => {
                    if val != 0x1f80_2000 {
                        warn!("bad expansion 2 base address: {val:#010x}");
                    }
                }
                _ => debug!("unhandled MEM_CONTROL write at offset {off:#x}: {val:#010x}"),
            }
            return Ok(());
        }
        if map::RAM_SIZE.contains(abs).is_some() {
            debug!("RAM_SIZE write ignored: {val:#010x}");
            return Ok(());
        }
        if map::CACHE_CONTROL.contains(abs).is_some() {
            debug!("CACHE_CONTROL write ignored: {val:#010x}");
            return Ok(());
        }
        if let Some(off) = map::IRQ_CONTROL.contains(abs) {
            debug!("IRQ_CONTROL write at offset {off:#x}: {val:#010x}");
            return Ok(());
        }
        if let Some(off) = map::DMA.contains(abs) {
            self.dma_store32(off, val)?;
            return Ok(());
        }
        if let Some(off) = map::GPU.contains(abs) {
            match off {
                0 => self.gpu.gp0(val),
                4 => self.gpu.gp1(val),
                _ => debug!("unhandled GPU write at offset {off:#x}: {val:#010x}"),
            }
            return Ok(());
        }
        if map::TIMERS.contains(abs).is_some() {
            debug!("TIMERS write ignored: {val:#010x}");
            return Ok(());
        }

        Err(EmuError::UnmappedAddress { pc: addr, addr: abs, width: 32 })
    }

    pub fn load16(&mut self, addr: u32) -> Result<u16, EmuError> {
        let abs = mask_region(addr);

        if let Some(off) = map::RAM.contains(abs) {
            return Ok(self.ram.load16(off));
        }
        if map::SPU.contains(abs).is_some() {
            return Ok(0);
        }
        if map::TIMERS.contains(abs).is_some() {
            return Ok(0);
        }
        if map::IRQ_CONTROL.contains(abs).is_some() {
            return Ok(0);
        }

        Err(EmuError::UnmappedAddress { pc: addr, addr: abs, width: 16 })
    }

    pub fn store16(&mut self, addr: u32, val: u16) -> Result<(), EmuError> {
        let abs = mask_region(addr);

        if let Some(off) = map::RAM.contains(abs) {
            self.ram.store16(off, val);
            return Ok(());
        }
        if map::SPU.contains(abs).is_some() {
            debug!("unhandled SPU write: {val:#06x}");
            return Ok(());
        }
        if map::TIMERS.contains(abs).is_some() {
            debug!("unhandled TIMERS write: {val:#06x}");
            return Ok(());
        }
        if map::IRQ_CONTROL.contains(abs).is_some() {
            debug!("unhandled IRQ_CONTROL write: {val:#06x}");
            return Ok(());
        }

        Err(EmuError::UnmappedAddress { pc: addr, addr: abs, width: 16 })
    }

    pub fn load8(&mut self, addr: u32) -> Result<u8, EmuError> {
        let abs = mask_region(addr);

        if let Some(off) = map::RAM.contains(abs) {
            return Ok(self.ram.load8(off));
        }
        if let Some(off) = map::BIOS.contains(abs) {
            return Ok(self.bios.load8(off));
        }
        if map::EXPANSION_1.contains(abs).is_some() {
            return Ok(0xff);
        }

        Err(EmuError::UnmappedAddress { pc: addr, addr: abs, width: 8 })
    }

    pub fn store8(&mut self, addr: u32, val: u8) -> Result<(), EmuError> {
        let abs = mask_region(addr);

        if let Some(off) = map::RAM.contains(abs) {
            self.ram.store8(off, val);
            return Ok(());
        }
        if map::EXPANSION_2.contains(abs).is_some() {
            debug!("unhandled EXPANSION_2 write: {val:#04x}");
            return Ok(());
        }

        Err(EmuError::UnmappedAddress { pc: addr, addr: abs, width: 8 })
    }

    fn dma_load32(&self, off: u32) -> u32 {
        let (major, minor) = dma::decode_offset(off);
        if major == 7 {
            return match minor {
                0 => self.dma.control,
                4 => self.dma.interrupt(),
                _ => 0,
            };
        }
        let channel = self.dma.channel(Port::from_index(major));
        match minor {
            0x0 => channel.base(),
            0x4 => channel.block_control(),
            0x8 => channel.control(),
            _ => 0,
        }
    }

    fn dma_store32(&mut self, off: u32, val: u32) -> Result<(), EmuError> {
        let (major, minor) = dma::decode_offset(off);
        if major == 7 {
            match minor {
                0 => self.dma.control = val,
                4 => self.dma.set_interrupt(val),
                _ => debug!("unhandled DMA common write at minor {minor:#x}: {val:#010x}"),
            }
            return Ok(());
        }

        let port = Port::from_index(major);
        let became_active = {
            let channel = self.dma.channel_mut(port);
            match minor {
                0x0 => channel.set_base(val),
                0x4 => channel.set_block_control(val),
                0x8 => {
                    channel.set_control(val).map_err(|n| EmuError::UnknownSyncMode { value: n })?;
                }
                _ => debug!("unhandled DMA channel write at minor {minor:#x}: {val:#010x}"),
            }
            channel.active()
        };

        if became_active {
            self.run_dma(port)?;
        }
        Ok(())
    }

    /// Runs `port`'s transfer to completion. The CPU never observes an
    /// in-flight DMA: this returns only once the channel is fully drained.
    fn run_dma(&mut self, port: Port) -> Result<(), EmuError> {
        match self.dma.channel(port).sync {
            Sync::LinkedList => self.run_linked_list_dma(port),
            _ => self.run_block_dma(port),
        }
    }

    fn run_block_dma(&mut self, port: Port) -> Result<(), EmuError> {
        let channel = self.dma.channel(port);
        let direction = channel.direction;
        let step = match channel.step {
            crate::dma::Step::Increment => 4i32,
            crate::dma::Step::Decrement => -4i32,
        };
        let mut addr = channel.base();
        let mut remaining = channel
            .transfer_size()
            .expect("Manual/Request channels always have a known transfer size");

        trace!("DMA {} block transfer: base={addr:#010x} words={remaining}", port.name());

        while remaining > 0 {
            let cur_addr = addr & 0x001f_fffc;

            match direction {
                Direction::FromRam => {
                    let word = self.ram.load32(cur_addr);
                    match port {
                        Port::Gpu => self.gpu.gp0(word),
                        _ => {
                            return Err(EmuError::DmaProtocolViolation {
                                port: port.name(),
                                detail: "FromRam block transfer into a port with no sink".into(),
                            })
                        }
                    }
                }
                Direction::ToRam => {
                    let word = match port {
                        Port::Otc => {
                            if remaining == 1 {
                                0x00ff_ffff
                            } else {
                                addr.wrapping_sub(4) & 0x001f_ffff
                            }
                        }
                        _ => {
                            return Err(EmuError::DmaProtocolViolation {
                                port: port.name(),
                                detail: "ToRam block transfer from a port with no source".into(),
                            })
                        }
                    };
                    self.ram.store32(cur_addr, word);
                }
            }

            addr = addr.wrapping_add_signed(step);
            remaining -= 1;
        }

        self.dma.channel_mut(port).done();
        Ok(())
    }

    fn run_linked_list_dma(&mut self, port: Port) -> Result<(), EmuError> {
        if port != Port::Gpu || self.dma.channel(port).direction != Direction::FromRam {
            return Err(EmuError::DmaProtocolViolation {
                port: port.name(),
                detail: "linked-list transfers are only defined for GPU/FromRam".into(),
            });
        }

        let mut addr = self.dma.channel(port).base() & 0x001f_fffc;

        loop {
            let header = self.ram.load32(addr);
            let mut count = header >> 24;

            while count > 0 {
                addr = (addr + 4) & 0x001f_fffc;
                let command = self.ram.load32(addr);
                self.gpu.gp0(command);
                count -= 1;
            }

            if header & 0x0080_0000 != 0 {
                break;
            }
            addr = header & 0x001f_fffc;
        }

        self.dma.channel_mut(port).done();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bus() -> Bus {
        Bus::new(Bios::new(vec![0; crate::bios::BIOS_SIZE]).unwrap())
    }

    #[test]
    fn otc_clear_builds_descending_linked_list() {
        let mut bus = test_bus();
        let channel = bus.dma.channel_mut(Port::Otc);
        channel.set_base(0x0000_1000);
        channel.set_block_control(4);
        channel.direction = Direction::ToRam;
        channel.step = crate::dma::Step::Decrement;
        channel.sync = Sync::Manual;
        channel.enable = true;
        channel.trigger = true;

        bus.run_dma(Port::Otc).unwrap();

        assert_eq!(bus.ram.load32(0x1000), 0x00ff_ffff);
        assert_eq!(bus.ram.load32(0x0ffc), 0x0000_0ffc);
        assert_eq!(bus.ram.load32(0x0ff8), 0x0000_0ff8);
        assert_eq!(bus.ram.load32(0x0ff4), 0x0000_0ff4);
        assert!(!bus.dma.channel(Port::Otc).active());
    }

    #[test]
    fn linked_list_forwards_every_word_to_gpu() {
        let mut bus = test_bus();
        // node 0 @0: header says 2 params follow, terminal bit set.
        bus.ram.store32(0, 0x0080_0002);
        bus.ram.store32(4, 0x1111_1111);
        bus.ram.store32(8, 0x2222_2222);

        let channel = bus.dma.channel_mut(Port::Gpu);
        channel.set_base(0);
        channel.direction = Direction::FromRam;
        channel.sync = Sync::LinkedList;
        channel.enable = true;

        bus.run_dma(Port::Gpu).unwrap();
        assert!(!bus.dma.channel(Port::Gpu).active());
    }

    #[test]
    fn unmapped_address_is_an_error_not_a_panic() {
        let mut bus = test_bus();
        assert!(bus.load32(0x1f80_1100 + 0x40 /* past TIMERS */).is_err());
    }
}
