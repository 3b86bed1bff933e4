//! Black-box scenarios driving a `Cpu`/`Bus` pair through a synthetic,
//! in-memory BIOS image. No filesystem dependency.

use rpsx::bios::Bios;
use rpsx::bus::Bus;
use rpsx::cpu::Cpu;

fn rig(words: &[(u32, u32)]) -> (Cpu, Bus) {
    let mut image = vec![0u8; rpsx::bios::BIOS_SIZE];
    for &(offset, word) in words {
        let o = offset as usize;
        image[o..o + 4].copy_from_slice(&word.to_le_bytes());
    }
    (Cpu::new(), Bus::new(Bios::new(image).unwrap()))
}

#[test]
fn reset_fetch() {
    let (mut cpu, mut bus) = rig(&[(0, 0x3c08_0013)]);
    cpu.run_next_instruction(&mut bus).unwrap();
    assert_eq!(cpu.reg(8), 0x0013_0000);
    assert_eq!(cpu.pc(), 0xbfc0_0004);
    assert_eq!(cpu.next_pc(), 0xbfc0_0008);
    assert_eq!(cpu.retired(), 1);
}

#[test]
fn branch_delay_runs_both_oris_when_branch_is_not_taken() {
    // BNE r0,r0,+1 ; ORI r1,r0,0xbeef ; ORI r2,r0,0xf00d
    let (mut cpu, mut bus) = rig(&[(0, 0x1400_0001), (4, 0x3401_beef), (8, 0x3402_f00d)]);
    cpu.run_next_instruction(&mut bus).unwrap();
    assert_eq!(cpu.reg(1), 0); // branch not taken: ORI hasn't run yet this tick
    cpu.run_next_instruction(&mut bus).unwrap();
    assert_eq!(cpu.reg(1), 0xbeef);
    cpu.run_next_instruction(&mut bus).unwrap();
    assert_eq!(cpu.reg(2), 0xf00d);
}

#[test]
fn taken_branch_runs_the_delay_slot_but_skips_its_target() {
    // BEQ r0,r0,+1 ; ORI r1,0x1111 ; ORI r2,0x2222 ; ORI r3,0x3333
    let (mut cpu, mut bus) = rig(&[
        (0, 0x1000_0001),
        (4, 0x3401_1111),
        (8, 0x3402_2222),
        (0xc, 0x3403_3333),
    ]);
    for _ in 0..4 {
        cpu.run_next_instruction(&mut bus).unwrap();
    }
    assert_eq!(cpu.reg(1), 0x1111);
    assert_eq!(cpu.reg(2), 0);
    assert_eq!(cpu.reg(3), 0x3333);
}

#[test]
fn load_delay_is_visible_only_after_the_next_tick() {
    // LW r1,0(r0) ; ADDIU r2,r1,0 ; ADDIU r3,r1,0 -- RAM[0] = 0xcafebabe
    let (mut cpu, mut bus) = rig(&[(0, 0x8c01_0000), (4, 0x2422_0000), (8, 0x2423_0000)]);
    bus.store32(0, 0xcafe_babe).unwrap();
    cpu.run_next_instruction(&mut bus).unwrap();
    cpu.run_next_instruction(&mut bus).unwrap();
    assert_eq!(cpu.reg(2), 0xdead_c0de);
    cpu.run_next_instruction(&mut bus).unwrap();
    assert_eq!(cpu.reg(3), 0xcafe_babe);
}

#[test]
fn overflow_exception_leaves_destination_unchanged() {
    // ADDI r1,r0,1 ; LUI r2,0x7fff ; ORI r2,r2,0xffff ; ADD r3,r2,r1
    let (mut cpu, mut bus) = rig(&[
        (0, 0x2001_0001),
        (4, 0x3c02_7fff),
        (8, 0x3442_ffff),
        (0xc, 0x0041_1820),
    ]);
    for _ in 0..4 {
        cpu.run_next_instruction(&mut bus).unwrap();
    }
    assert_eq!(cpu.pc(), 0x8000_0080);
    assert_eq!(cpu.epc(), 0xc + 0xbfc0_0000);
    assert_eq!(cpu.cause(), 12 << 2);
    assert_eq!(cpu.reg(3), 0);
}

#[test]
fn cache_isolated_store_is_a_silent_no_op() {
    // ORI r2,r0,0x1234 ; LUI r1,1 ; MTC0 r1,$12 ; SW r2,0(r0)
    let (mut cpu, mut bus) = rig(&[
        (0, 0x3402_1234),
        (4, 0x3c01_0001),
        (8, 0x4081_6000),
        (0xc, 0xac02_0000),
    ]);
    for _ in 0..4 {
        cpu.run_next_instruction(&mut bus).unwrap();
    }
    assert_eq!(cpu.sr(), 0x1_0000);
    assert_eq!(bus.load32(0).unwrap(), 0);
}

#[test]
fn dma_otc_clear_builds_the_ordering_table_immediately_on_trigger() {
    let (_cpu, mut bus) = rig(&[]);

    // DMA range base 0x1f801080; Otc is channel major index 6.
    const OTC_BASE: u32 = 0x1f80_1080 + (6 << 4);
    bus.store32(OTC_BASE, 0x0000_1000).unwrap(); // channel base
    bus.store32(OTC_BASE + 4, 4).unwrap(); // block_size = 4, block_count = 0
                                            // direction=ToRam(0), step=Decrement(bit1), sync=Manual(0), enable(24), trigger(28)
    bus.store32(OTC_BASE + 8, (1 << 24) | (1 << 28) | (1 << 1)).unwrap();

    assert_eq!(bus.load32(0x1000).unwrap(), 0x00ff_ffff);
    assert_eq!(bus.load32(0x0ffc).unwrap(), 0x0000_0ffc);
    assert_eq!(bus.load32(0x0ff8).unwrap(), 0x0000_0ff8);
    assert_eq!(bus.load32(0x0ff4).unwrap(), 0x0000_0ff4);

    // Channel control readback: enable/trigger both cleared by channel.done().
    let control = bus.load32(OTC_BASE + 8).unwrap();
    assert_eq!(control & (1 << 24), 0);
    assert_eq!(control & (1 << 28), 0);
}

#[test]
fn illegal_instruction_word_is_trapped_not_fatal() {
    let (mut cpu, mut bus) = rig(&[(0, 0xffff_ffff)]);
    cpu.run_next_instruction(&mut bus).unwrap();
    assert_eq!(cpu.cause(), 10 << 2);
    assert_eq!(cpu.pc(), 0x8000_0080);
}
