use chippy::{Interpreter, InterpreterError, PROGRAM_START_ADDRESS, TickOutcome, u4};

fn rom(opcodes: &[u16]) -> Vec<u8> {
    opcodes.iter().flat_map(|op| op.to_be_bytes()).collect()
}

fn boot(opcodes: &[u16]) -> Interpreter {
    let mut chip = Interpreter::new_with_seed(42);
    chip.load_program(&rom(opcodes)).expect("program fits in memory");
    chip
}

#[test]
fn add_two_registers() {
    let mut chip = boot(&[0x6005, 0x6103, 0x8014]);
    for _ in 0..3 {
        chip.tick().unwrap();
    }

    assert_eq!(chip.v_registers()[0], 8);
    assert_eq!(chip.v_registers()[0xF], 0);
    assert_eq!(chip.program_counter(), PROGRAM_START_ADDRESS + 6);
}

#[test]
fn drawing_a_blank_sprite_changes_nothing() {
    // CLS, LD I 0x300 (zeroed), DRW V0, V0, 5
    let mut chip = boot(&[0x00E0, 0xA300, 0xD005]);
    for _ in 0..3 {
        chip.tick().unwrap();
    }

    assert!(chip.display().iter().all(|&pixel| !pixel));
    assert_eq!(chip.v_registers()[0xF], 0);
}

#[test]
fn countdown_with_delay_timer() {
    // LD V0, 3 / LD DT, V0 / loop: LD V1, DT / SE V1, 0 / JP loop / LD V2, 0xAA
    let mut chip = boot(&[0x6003, 0xF015, 0xF107, 0x3100, 0x1204, 0x62AA]);
    chip.tick().unwrap();
    chip.tick().unwrap();

    let mut frames = 0;
    while chip.v_registers()[2] != 0xAA {
        for _ in 0..4 {
            chip.tick().unwrap();
        }
        chip.tick_timers();
        frames += 1;
        assert!(frames < 10, "timer never expired");
    }
    assert_eq!(chip.delay_timer(), 0);
}

#[test]
fn subroutine_writes_bcd_and_reads_it_back() {
    // 0x200: LD V0, 0x9C (156) / CALL 0x20A / LD V3, 0xFF / JP 0x206
    // 0x208: NOP
    // 0x20A: LD I, 0x300 / LD B, V0 / LD V2, [I] / RET
    let mut chip = boot(&[
        0x609C, 0x220A, 0x63FF, 0x1206, 0x0000, 0xA300, 0xF033, 0xF265, 0x00EE,
    ]);
    for _ in 0..7 {
        chip.tick().unwrap();
    }

    assert_eq!(&chip.v_registers()[..4], &[1, 5, 6, 0xFF]);
    assert_eq!(chip.stack().pointer(), 0);
}

#[test]
fn key_wait_resumes_after_press() {
    let mut chip = boot(&[0xF70A, 0x6101]);
    for _ in 0..5 {
        assert_eq!(chip.tick(), Ok(TickOutcome::AwaitingKey));
    }
    assert_eq!(chip.program_counter(), PROGRAM_START_ADDRESS);

    chip.set_key(u4::new(0xD), true);
    assert_eq!(chip.tick(), Ok(TickOutcome::Continue));
    assert_eq!(chip.v_registers()[7], 0xD);

    chip.tick().unwrap();
    assert_eq!(chip.v_registers()[1], 1);
}

#[test]
fn stack_errors_are_reported_not_panics() {
    let mut chip = boot(&[0x00EE]);
    assert_eq!(chip.tick(), Err(InterpreterError::StackUnderflow));

    let mut chip = boot(&[0x2200]);
    let error = loop {
        if let Err(error) = chip.tick() {
            break error;
        }
    };
    assert!(matches!(error, InterpreterError::StackOverflow { .. }));
    assert!(error.to_string().contains("Stack overflow"));
}

#[test]
fn reset_then_reload_runs_again() {
    let program = rom(&[0x6005, 0x7001]);
    let mut chip = Interpreter::new_with_seed(1);
    chip.load_program(&program).unwrap();
    chip.tick().unwrap();
    chip.tick().unwrap();
    assert_eq!(chip.v_registers()[0], 6);

    chip.reset();
    assert_eq!(chip.v_registers()[0], 0);
    assert_eq!(chip.memory()[PROGRAM_START_ADDRESS as usize], 0);

    chip.load_program(&program).unwrap();
    chip.tick().unwrap();
    assert_eq!(chip.v_registers()[0], 5);
}

#[test]
fn independent_machines_share_nothing() {
    let mut a = boot(&[0x6011]);
    let b = boot(&[0x6022]);
    a.tick().unwrap();
    assert_eq!(a.v_registers()[0], 0x11);
    assert_eq!(b.v_registers()[0], 0);
    assert_eq!(b.program_counter(), PROGRAM_START_ADDRESS);
}
