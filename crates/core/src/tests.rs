#[cfg(test)]
mod tests {
    use crate::clock::SimClock;
    use crate::interrupt::HandlerContract;
    use crate::metrics::ActivityMetrics;
    use crate::programs::{self, DEFAULT_MAX_PASSES};
    use crate::{Machine, Peripheral, SimulationError, Stimulus};
    use pinwire_hal::blink::BlinkLoop;
    use pinwire_hal::toggle::InterruptToggle;
    use pinwire_hal::{
        ExternalInterrupt, Pin, Port, Processor, Register, RegisterFile, Sense, SleepMode,
    };
    use std::sync::Arc;
    use std::time::Duration;

    const BUTTON: Pin = Pin::new(Port::D, 2);
    const LED: Pin = Pin::LED_BUILTIN;

    fn assert_close(actual: Duration, expected_ms: u64) {
        let expected = Duration::from_millis(expected_ms);
        let diff = if actual > expected {
            actual - expected
        } else {
            expected - actual
        };
        assert!(
            diff < Duration::from_millis(1),
            "expected ~{}ms, got {:?}",
            expected_ms,
            actual
        );
    }

    /// Button idles high, then `presses` press/release pairs 100 ms apart.
    fn machine_with_presses(presses: u64) -> Machine {
        let mut machine = Machine::default();
        machine.drive_pin(BUTTON, true).unwrap();
        for i in 0..presses {
            let at = 100 + i * 100;
            machine.schedule(Stimulus {
                at_ms: at,
                pin: BUTTON,
                high: false,
            });
            machine.schedule(Stimulus {
                at_ms: at + 50,
                pin: BUTTON,
                high: true,
            });
        }
        machine
    }

    #[test]
    fn test_gpio_pin_write_toggles_port() {
        let mut port = crate::peripherals::GpioPort::new();
        port.write(0x01, 0b0010_0000).unwrap();
        port.write(0x00, 0b0010_0000).unwrap();
        assert_eq!(port.read(0x02).unwrap(), 0b0010_0000);
        assert_eq!(port.read(0x00).unwrap(), 0b0010_0000);
        port.write(0x00, 0b0010_0000).unwrap();
        assert_eq!(port.read(0x00).unwrap(), 0);
    }

    #[test]
    fn test_gpio_input_levels() {
        let mut port = crate::peripherals::GpioPort::new();
        // Floating input reads low, pull-up reads high, a driver wins.
        assert_eq!(port.levels() & 0b100, 0);
        port.write(0x02, 0b100).unwrap();
        assert_eq!(port.levels() & 0b100, 0b100);
        port.drive(2, false);
        assert_eq!(port.levels() & 0b100, 0);
        port.release(2);
        assert_eq!(port.levels() & 0b100, 0b100);
    }

    #[test]
    fn test_unmapped_address() {
        let machine = Machine::default();
        let err = machine.bus.read_u8(0x40).unwrap_err();
        assert!(matches!(err, SimulationError::UnmappedAddress(0x40)));
    }

    #[test]
    fn test_eifr_is_write_one_to_clear() {
        let mut machine = Machine::default();
        machine.write(Register::Eicra, 0b10);
        machine.drive_pin(BUTTON, true).unwrap();
        machine.drive_pin(BUTTON, false).unwrap();
        assert_eq!(machine.read(Register::Eifr), 0b01);

        machine.write(Register::Eifr, 0b00);
        assert_eq!(machine.read(Register::Eifr), 0b01);
        machine.write(Register::Eifr, 0b01);
        assert_eq!(machine.read(Register::Eifr), 0);
    }

    #[test]
    fn test_blink_duty_cycle() {
        let mut machine = Machine::default();
        let waveform = programs::simulate_blink(&mut machine, &BlinkLoop::default(), 3).unwrap();

        let highs = waveform.high_durations();
        let lows = waveform.low_durations();
        assert_eq!(highs.len(), 3);
        assert_eq!(lows.len(), 2);
        for high in highs {
            assert_close(high, 3000);
        }
        for low in lows {
            assert_close(low, 500);
        }
        for period in waveform.periods() {
            assert_close(period, 3500);
        }
        assert!(machine.is_bit_set(Register::DdrB, 5));
        assert_eq!(waveform.final_level(), Some(false));
    }

    #[test]
    fn test_blink_custom_timing() {
        let mut machine = Machine::new(8_000_000);
        let blink = BlinkLoop::new(Pin::new(Port::C, 0)).with_timing(20, 80);
        let waveform = programs::simulate_blink(&mut machine, &blink, 2).unwrap();
        assert_close(waveform.high_durations()[0], 20);
        assert_close(waveform.low_durations()[0], 80);
        assert!(machine.clock.now_ms() >= 200);
    }

    #[test]
    fn test_toggle_parity_law() {
        for presses in 0..6u64 {
            let mut machine = machine_with_presses(presses);
            let outcome = programs::simulate_toggle(
                &mut machine,
                &InterruptToggle::default(),
                DEFAULT_MAX_PASSES,
            )
            .unwrap();

            assert_eq!(outcome.toggles as u64, presses);
            assert_eq!(outcome.led_high, presses % 2 == 1, "presses={}", presses);
            assert_eq!(machine.level(LED), presses % 2 == 1);
        }
    }

    #[test]
    fn test_rising_edges_do_not_toggle() {
        let mut machine = Machine::default();
        machine.drive_pin(BUTTON, false).unwrap();
        machine.schedule(Stimulus {
            at_ms: 100,
            pin: BUTTON,
            high: true,
        });

        let outcome =
            programs::simulate_toggle(&mut machine, &InterruptToggle::default(), 10).unwrap();

        assert_eq!(outcome.toggles, 0);
        assert!(!outcome.led_high);
        assert_eq!(machine.pending_stimulus(), 0);
    }

    #[test]
    fn test_sleeps_between_edges() {
        let metrics = Arc::new(ActivityMetrics::new());
        let mut machine = machine_with_presses(3);
        machine.observers.push(metrics.clone());

        let outcome =
            programs::simulate_toggle(&mut machine, &InterruptToggle::default(), 100).unwrap();

        assert_eq!(outcome.sleeping, Some(SleepMode::Idle));
        assert!(machine.is_sleeping());
        assert_eq!(outcome.passes, 4);
        assert_eq!(metrics.get_sleeps(), 4);
        assert_eq!(metrics.get_wakeups(), 3);
        assert_eq!(metrics.get_interrupts(), 3);
        // One PINB write per interrupt.
        assert_eq!(metrics.report().handler_accesses, 3);
    }

    #[test]
    fn test_edges_do_not_wake_standby() {
        let mut machine = machine_with_presses(2);
        let toggle = InterruptToggle::default().with_sleep_mode(SleepMode::Standby);

        let outcome = programs::simulate_toggle(&mut machine, &toggle, 10).unwrap();

        assert_eq!(outcome.toggles, 0);
        assert_eq!(outcome.sleeping, Some(SleepMode::Standby));
        // No I/O clock, no edge detector.
        assert_eq!(machine.read(Register::Eifr), 0);
    }

    #[test]
    fn test_low_level_held_is_a_storm() {
        let mut machine = Machine::default().with_max_dispatch(8);
        machine.drive_pin(BUTTON, true).unwrap();
        machine.schedule(Stimulus {
            at_ms: 10,
            pin: BUTTON,
            high: false,
        });
        let toggle = InterruptToggle::default()
            .with_sense(Sense::LowLevel)
            .with_sleep_mode(SleepMode::PowerDown);

        let err = programs::simulate_toggle(&mut machine, &toggle, 10).unwrap_err();
        assert!(matches!(err, SimulationError::InterruptStorm { count: 8, .. }));
    }

    #[test]
    fn test_handler_contract_rejects_foreign_register() {
        let mut machine = Machine::default();
        machine.attach_handler(
            ExternalInterrupt::Int0,
            HandlerContract::new(vec![Register::PinB]),
            Box::new(|regs: &mut dyn RegisterFile| regs.write(Register::PortD, 0xFF)),
        );
        machine.write(Register::Eicra, 0b10);
        machine.write(Register::Eimsk, 0b01);
        machine.enable_interrupts();
        machine.drive_pin(BUTTON, true).unwrap();

        let err = machine.drive_pin(BUTTON, false).unwrap_err();
        assert!(matches!(err, SimulationError::HandlerContract { line: "INT0", .. }));
        assert_eq!(machine.read(Register::PortD), 0);
        // reti still ran
        assert!(machine.interrupts_enabled());
    }

    #[test]
    fn test_handler_contract_budget() {
        let mut machine = Machine::default();
        let toggle = InterruptToggle::default();
        machine.attach_handler(
            toggle.line,
            programs::toggle_contract(&toggle),
            Box::new(move |regs: &mut dyn RegisterFile| {
                toggle.on_interrupt(regs);
                toggle.on_interrupt(regs);
            }),
        );
        toggle.configure(&mut machine);
        machine.drive_pin(BUTTON, true).unwrap();

        let err = machine.drive_pin(BUTTON, false).unwrap_err();
        match err {
            SimulationError::HandlerContract { reason, .. } => assert!(reason.contains("budget")),
            other => panic!("unexpected error: {}", other),
        }
        // First write went through, the second was dropped.
        assert!(machine.level(LED));
    }

    #[test]
    fn test_missing_handler() {
        let mut machine = Machine::default();
        machine.drive_pin(BUTTON, true).unwrap();
        InterruptToggle::default().configure(&mut machine);
        machine.check().unwrap();

        let err = machine.drive_pin(BUTTON, false).unwrap_err();
        assert!(matches!(err, SimulationError::MissingHandler { line: "INT0" }));
    }

    #[test]
    fn test_masked_flag_fires_on_unmask() {
        let mut machine = Machine::default();
        let toggle = InterruptToggle::default();
        programs::install_toggle(&mut machine, &toggle);
        machine.write(Register::DdrB, 1 << 5);
        machine.write(Register::Eicra, 0b10);
        machine.enable_interrupts();

        machine.drive_pin(BUTTON, true).unwrap();
        assert_eq!(machine.drive_pin(BUTTON, false).unwrap(), 0);
        assert!(!machine.level(LED));

        machine.write(Register::Eimsk, 0b01);
        machine.check().unwrap();
        assert!(machine.level(LED));
        assert_eq!(machine.read(Register::Eifr), 0);
    }

    #[test]
    fn test_interrupt_preempts_busy_wait() {
        let mut machine = Machine::default();
        let toggle = InterruptToggle::default();
        programs::install_toggle(&mut machine, &toggle);
        machine.drive_pin(BUTTON, true).unwrap();
        toggle.configure(&mut machine);
        machine.schedule(Stimulus {
            at_ms: 250,
            pin: BUTTON,
            high: false,
        });

        pinwire_hal::Delay::delay_ms(&mut machine, 1000);

        assert!(machine.level(LED));
        assert_eq!(machine.clock.now_ms(), 1000);
        let rise = machine.waveform(LED);
        assert_eq!(rise.rising_edges(), 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut machine = machine_with_presses(1);
        programs::simulate_toggle(&mut machine, &InterruptToggle::default(), 10).unwrap();

        let snapshot = machine.snapshot();
        assert_eq!(snapshot.registers["PORTB"], 1 << 5);
        assert_eq!(snapshot.registers["EIMSK"], 1);

        // Parked at `sleep`: sleep_mode() already cleared SE on the way out.
        assert_eq!(snapshot.sleeping, Some(SleepMode::Idle));
        assert_eq!(snapshot.registers["SMCR"] & 0x01, 0);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["type"], "pinwire_atmega328p");
        assert_eq!(json["sleeping"], "idle");
        assert_eq!(json["interrupts_enabled"], true);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut machine = machine_with_presses(1);
        programs::simulate_toggle(&mut machine, &InterruptToggle::default(), 10).unwrap();
        machine.reset();
        assert_eq!(machine.clock.cycles(), 0);
        assert!(machine.trace().is_empty());
        assert!(!machine.is_sleeping());
        assert_eq!(machine.read(Register::PortB), 0);
    }

    #[test]
    fn test_release_pin_falls_back_to_pull_up() {
        let mut machine = Machine::default();
        let toggle = InterruptToggle::default();
        programs::install_toggle(&mut machine, &toggle);
        toggle.configure(&mut machine);
        machine.write(Register::PortD, 1 << 2);
        assert!(machine.level(BUTTON));

        assert_eq!(machine.drive_pin(BUTTON, false).unwrap(), 1);
        assert!(machine.level(LED));

        // Released, the pull-up raises the line again without an interrupt.
        assert_eq!(machine.release_pin(BUTTON).unwrap(), 0);
        assert!(machine.level(BUTTON));
        assert!(machine.level(LED));

        assert_eq!(machine.drive_pin(BUTTON, false).unwrap(), 1);
        assert!(!machine.level(LED));
    }

    #[test]
    fn test_any_change_toggles_twice_per_press() {
        let mut machine = machine_with_presses(2);
        let toggle = InterruptToggle::default().with_sense(Sense::AnyChange);

        let outcome = programs::simulate_toggle(&mut machine, &toggle, 100).unwrap();

        assert_eq!(outcome.toggles, 4);
        assert!(!outcome.led_high);
        assert_eq!(outcome.sleeping, Some(SleepMode::Idle));
        assert_eq!(outcome.passes, 5);
    }

    #[test]
    fn test_max_passes_cuts_run_short() {
        let mut machine = machine_with_presses(3);

        let outcome =
            programs::simulate_toggle(&mut machine, &InterruptToggle::default(), 2).unwrap();

        assert_eq!(outcome.passes, 2);
        assert_eq!(outcome.toggles, 2);
        assert!(!outcome.led_high);
        assert_eq!(outcome.sleeping, None);
        assert_eq!(machine.pending_stimulus(), 3);
    }

    #[test]
    fn test_reserved_sleep_mode_acts_as_idle() {
        let mut machine = machine_with_presses(1);
        let toggle = InterruptToggle::default();
        programs::install_toggle(&mut machine, &toggle);
        toggle.configure(&mut machine);

        // SM2..0 = 0b100 is reserved; SE set.
        machine.write(Register::Smcr, 0b1001);
        machine.sleep();
        machine.check().unwrap();

        assert!(!machine.is_sleeping());
        assert!(machine.level(LED));
    }

    #[test]
    fn test_far_future_stimulus() {
        let at_ms = 2_000_000_000_000;
        let mut machine = Machine::default();
        machine.drive_pin(BUTTON, true).unwrap();
        machine.schedule(Stimulus {
            at_ms,
            pin: BUTTON,
            high: false,
        });

        let outcome =
            programs::simulate_toggle(&mut machine, &InterruptToggle::default(), 10).unwrap();

        assert_eq!(outcome.toggles, 1);
        assert_eq!(machine.clock.now_ms(), at_ms);
    }

    #[test]
    fn test_clock_saturates() {
        let mut clock = SimClock::default();
        assert_eq!(clock.ms_to_cycles(u64::MAX), u64::MAX);

        clock.advance_ms(u64::MAX);
        clock.advance_cycles(10);
        assert_eq!(clock.cycles(), u64::MAX);
        assert_eq!(clock.now_ms(), u64::MAX / 16_000);
    }
}
