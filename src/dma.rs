//! The seven-channel DMA register file and transfer engine. `DmaController`
//! only holds register state; `Bus::run_dma` (see `bus.rs`) is what actually
//! moves words, since that's where RAM and the GPU port are both reachable.

/// One of the seven hardwired DMA ports, in register-file order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Port {
    MdecIn = 0,
    MdecOut = 1,
    Gpu = 2,
    CdRom = 3,
    Spu = 4,
    Pio = 5,
    Otc = 6,
}

impl Port {
    pub fn from_index(index: u32) -> Self {
        match index {
            0 => Port::MdecIn,
            1 => Port::MdecOut,
            2 => Port::Gpu,
            3 => Port::CdRom,
            4 => Port::Spu,
            5 => Port::Pio,
            6 => Port::Otc,
            _ => unreachable!("major index is masked to 0..=6 by the caller"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Port::MdecIn => "MdecIn",
            Port::MdecOut => "MdecOut",
            Port::Gpu => "Gpu",
            Port::CdRom => "CdRom",
            Port::Spu => "Spu",
            Port::Pio => "Pio",
            Port::Otc => "Otc",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    ToRam,
    FromRam,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    Increment,
    Decrement,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Sync {
    Manual,
    Request,
    LinkedList,
}

/// Per-channel register file plus the bits derived from CHANNEL_CONTROL.
#[derive(Debug, Copy, Clone)]
pub struct DmaChannel {
    pub enable: bool,
    pub direction: Direction,
    pub step: Step,
    pub sync: Sync,
    pub trigger: bool,
    pub chop: bool,
    pub chop_dma_sz: u8,
    pub chop_cpu_sz: u8,
    pub base: u32,
    pub block_size: u16,
    pub block_count: u16,
    dummy: u8,
}

impl DmaChannel {
    pub fn new() -> Self {
        DmaChannel {
            enable: false,
            direction: Direction::ToRam,
            step: Step::Increment,
            sync: Sync::Manual,
            trigger: false,
            chop: false,
            chop_dma_sz: 0,
            chop_cpu_sz: 0,
            base: 0,
            block_size: 0,
            block_count: 0,
            dummy: 0,
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn set_base(&mut self, val: u32) {
        self.base = val & 0x00ff_ffff;
    }

    pub fn block_control(&self) -> u32 {
        (self.block_count as u32) << 16 | self.block_size as u32
    }

    pub fn set_block_control(&mut self, val: u32) {
        self.block_size = val as u16;
        self.block_count = (val >> 16) as u16;
    }

    pub fn control(&self) -> u32 {
        let mut r = 0u32;
        r |= (self.direction == Direction::FromRam) as u32;
        r |= ((self.step == Step::Decrement) as u32) << 1;
        r |= (self.chop as u32) << 8;
        r |= (self.sync_bits()) << 9;
        r |= (self.chop_dma_sz as u32) << 16;
        r |= (self.chop_cpu_sz as u32) << 20;
        r |= (self.enable as u32) << 24;
        r |= (self.trigger as u32) << 28;
        r |= (self.dummy as u32) << 29;
        r
    }

    fn sync_bits(&self) -> u32 {
        match self.sync {
            Sync::Manual => 0,
            Sync::Request => 1,
            Sync::LinkedList => 2,
        }
    }

    /// Returns the old `Sync` value on success, or the raw bit pattern if
    /// the reserved encoding `0b11` was requested.
    pub fn set_control(&mut self, val: u32) -> Result<(), u32> {
        self.direction = if val & 1 != 0 { Direction::FromRam } else { Direction::ToRam };
        self.step = if (val >> 1) & 1 != 0 { Step::Decrement } else { Step::Increment };
        self.chop = (val >> 8) & 1 != 0;

        self.sync = match (val >> 9) & 3 {
            0 => Sync::Manual,
            1 => Sync::Request,
            2 => Sync::LinkedList,
            n => return Err(n),
        };

        self.chop_dma_sz = ((val >> 16) & 7) as u8;
        self.chop_cpu_sz = ((val >> 20) & 7) as u8;
        self.enable = (val >> 24) & 1 != 0;
        self.trigger = (val >> 28) & 1 != 0;
        self.dummy = ((val >> 29) & 3) as u8;
        Ok(())
    }

    /// `enable && (sync != Manual || trigger)`.
    pub fn active(&self) -> bool {
        let triggered = match self.sync {
            Sync::Manual => self.trigger,
            _ => true,
        };
        self.enable && triggered
    }

    /// `None` for linked-list transfers, whose length isn't known up front.
    pub fn transfer_size(&self) -> Option<u32> {
        match self.sync {
            Sync::Manual => Some(self.block_size as u32),
            Sync::Request => Some(self.block_count as u32 * self.block_size as u32),
            Sync::LinkedList => None,
        }
    }

    pub fn done(&mut self) {
        self.enable = false;
        self.trigger = false;
    }
}

impl Default for DmaChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// The seven channels plus the two global registers (CONTROL, INTERRUPT).
pub struct DmaController {
    pub control: u32,
    irq_enable: bool,
    channel_irq_enable: u8,
    channel_irq_flags: u8,
    force_irq: bool,
    irq_dummy: u8,
    channels: [DmaChannel; 7],
}

impl DmaController {
    pub fn new() -> Self {
        DmaController {
            control: 0x0765_4321,
            irq_enable: false,
            channel_irq_enable: 0,
            channel_irq_flags: 0,
            force_irq: false,
            irq_dummy: 0,
            channels: [DmaChannel::new(); 7],
        }
    }

    pub fn channel(&self, port: Port) -> &DmaChannel {
        &self.channels[port as usize]
    }

    pub fn channel_mut(&mut self, port: Port) -> &mut DmaChannel {
        &mut self.channels[port as usize]
    }

    /// `force_irq || (irq_enable && (channel_irq_flags & channel_irq_enable) != 0)`.
    pub fn irq(&self) -> bool {
        self.force_irq || (self.irq_enable && (self.channel_irq_flags & self.channel_irq_enable) != 0)
    }

    pub fn interrupt(&self) -> u32 {
        let mut r = self.irq_dummy as u32;
        r |= (self.force_irq as u32) << 15;
        r |= (self.channel_irq_enable as u32) << 16;
        r |= (self.irq_enable as u32) << 23;
        r |= (self.channel_irq_flags as u32) << 24;
        r |= (self.irq() as u32) << 31;
        r
    }

    pub fn set_interrupt(&mut self, val: u32) {
        self.irq_dummy = (val & 0x3f) as u8;
        self.force_irq = (val >> 15) & 1 != 0;
        self.channel_irq_enable = ((val >> 16) & 0x7f) as u8;
        self.irq_enable = (val >> 23) & 1 != 0;
        let ack = ((val >> 24) & 0x7f) as u8;
        self.channel_irq_flags &= !ack;
    }
}

impl Default for DmaController {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits a DMA-range offset into the channel selector and the register
/// selector within that channel (or `7` for the shared registers).
pub fn decode_offset(offset: u32) -> (u32, u32) {
    let major = (offset & 0x70) >> 4;
    let minor = offset & 0xf;
    (major, minor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_control_matches_nocash_spec() {
        assert_eq!(DmaController::new().control, 0x0765_4321);
    }

    #[test]
    fn channel_active_requires_trigger_only_in_manual_mode() {
        let mut c = DmaChannel::new();
        c.enable = true;
        c.sync = Sync::Manual;
        assert!(!c.active());
        c.trigger = true;
        assert!(c.active());

        let mut c = DmaChannel::new();
        c.enable = true;
        c.sync = Sync::Request;
        assert!(c.active());
    }

    #[test]
    fn transfer_size_by_sync_mode() {
        let mut c = DmaChannel::new();
        c.block_size = 4;
        c.sync = Sync::Manual;
        assert_eq!(c.transfer_size(), Some(4));
        c.sync = Sync::Request;
        c.block_count = 3;
        assert_eq!(c.transfer_size(), Some(12));
        c.sync = Sync::LinkedList;
        assert_eq!(c.transfer_size(), None);
    }

    #[test]
    fn interrupt_write_is_write_one_to_clear() {
        let mut d = DmaController::new();
        d.channel_irq_flags = 0b0010_0101;
        d.set_interrupt(0b0001_0000 << 24);
        assert_eq!(d.channel_irq_flags, 0b0010_0101 & !0b0001_0000);
    }

    #[test]
    fn interrupt_ack_reaches_bit_six_for_the_otc_channel() {
        let mut d = DmaController::new();
        d.channel_irq_flags = 0b0100_0000;
        d.set_interrupt(0b0100_0000 << 24);
        assert_eq!(d.channel_irq_flags, 0);
    }

    #[test]
    fn decode_offset_splits_major_minor() {
        assert_eq!(decode_offset(0x70), (7, 0));
        assert_eq!(decode_offset(0x74), (7, 4));
        assert_eq!(decode_offset(0x68), (6, 8));
    }
}
