//! GetCpuLoad on the local core and across cores.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use osek_cfg::generator::{ConfigGenerator, GeneratedConfig};
use osek_cfg::{ConformanceClass, CpuLoadConfig, OS_CPULOAD_INVALID, OsError, OsTask, TaskFlags};
use osek_kernel::{CpuLoadKind, Kernel, OSStartOs, OsCore};
use osek_platform::sim::{SimPlatform, SimTimer};

/// One autostart task per core, every core measuring over 10 x 100 ticks
fn two_cores(measured: bool) -> GeneratedConfig {
    let mut generator = ConfigGenerator::new(2, ConformanceClass::BCC1)
        .task(OsTask::new(0, 0, 1).with_flags(TaskFlags::AUTOSTART))
        .task(OsTask::new(1, 1, 1).with_flags(TaskFlags::AUTOSTART));
    if measured {
        generator = generator
            .cpu_load(0, CpuLoadConfig::new(100, 10))
            .cpu_load(1, CpuLoadConfig::new(100, 10));
    }
    generator.build().unwrap()
}

#[test]
fn disabled_measurement_reports_invalid() {
    let generated = two_cores(false);
    let cfg = generated.config();
    let timer = SimTimer::new();
    let platform = SimPlatform::new(0, &timer);
    let kernel = Kernel::new(&cfg, &platform);
    let core = kernel.core(0).unwrap();
    OSStartOs(core).unwrap();

    for kind in [CpuLoadKind::Current, CpuLoadKind::Peak, CpuLoadKind::PeakAndReset] {
        assert_eq!(core.get_cpu_load(0, kind), Ok(OS_CPULOAD_INVALID));
        // answered from the configuration, core 1 is never asked
        assert_eq!(core.get_cpu_load(1, kind), Ok(OS_CPULOAD_INVALID));
    }
    assert_eq!(core.get_cpu_load(3, CpuLoadKind::Current), Err(OsError::E_OS_ID));
}

#[test]
fn half_busy_core() {
    let generated = two_cores(true);
    let cfg = generated.config();
    let timer = SimTimer::new();
    let platform = SimPlatform::new(0, &timer);
    let kernel = Kernel::new(&cfg, &platform);
    let core = kernel.core(0).unwrap();
    OSStartOs(core).unwrap();

    assert_eq!(core.dispatch(), 0);
    timer.advance(500);
    core.terminate_task().unwrap();
    core.dispatch();
    timer.advance(500);

    assert_eq!(core.get_cpu_load(0, CpuLoadKind::Current), Ok(50));
    assert_eq!(core.get_cpu_load(0, CpuLoadKind::Peak), Ok(50));

    // an interrupt on an idle core counts as busy time too
    let isr = core.enter_isr();
    timer.advance(200);
    core.leave_isr(isr);
    timer.advance(300);
    assert_eq!(core.get_cpu_load(0, CpuLoadKind::Current), Ok(20));
    assert_eq!(core.get_cpu_load(0, CpuLoadKind::PeakAndReset), Ok(50));
    assert_eq!(core.get_cpu_load(0, CpuLoadKind::Peak), Ok(20));
}

#[test]
fn load_stays_in_range() {
    let generated = two_cores(true);
    let cfg = generated.config();
    let timer = SimTimer::new();
    let platform = SimPlatform::new(0, &timer);
    let kernel = Kernel::new(&cfg, &platform);
    let core = kernel.core(0).unwrap();
    OSStartOs(core).unwrap();

    let mut seed = 0x9e37_79b9u32;
    for _ in 0..500 {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        timer.advance((seed >> 24) as u64);
        if seed & 1 == 0 {
            let isr = core.enter_isr();
            timer.advance((seed >> 28) as u64);
            if seed & 2 == 0 {
                let _ = core.activate_task(0);
            }
            core.leave_isr(isr);
        } else {
            let _ = core.terminate_task();
            core.dispatch();
        }
        for kind in [CpuLoadKind::Current, CpuLoadKind::Peak] {
            let load = core.get_cpu_load(0, kind).unwrap();
            assert!(load <= 100, "load {load} out of range");
        }
    }
}

fn serve_until(core: OsCore<'_, '_>, stop: &AtomicBool) {
    while !stop.load(Ordering::SeqCst) {
        core.receive_messages();
        thread::yield_now();
    }
}

#[test]
fn remote_core_measures_itself() {
    let generated = two_cores(true);
    let cfg = generated.config();
    let timer = SimTimer::new();
    let platform = SimPlatform::new(0, &timer);
    let kernel = Kernel::new(&cfg, &platform);
    let core0 = kernel.core(0).unwrap();
    let core1 = kernel.core(1).unwrap();
    OSStartOs(core0).unwrap();
    OSStartOs(core1).unwrap();

    // core 1 runs its task for the whole window, core 0 stays idle
    assert_eq!(core1.dispatch(), 1);
    timer.advance(1000);

    let stop = AtomicBool::new(false);
    thread::scope(|s| {
        s.spawn(|| serve_until(core1, &stop));

        assert_eq!(core0.get_cpu_load(1, CpuLoadKind::Current), Ok(100));
        assert_eq!(core0.get_cpu_load(1, CpuLoadKind::Peak), Ok(100));
        assert_eq!(core0.get_cpu_load(0, CpuLoadKind::Current), Ok(0));
        stop.store(true, Ordering::SeqCst);
    });
}

#[test]
fn cores_asking_each_other_both_get_answers() {
    let generated = two_cores(true);
    let cfg = generated.config();
    let timer = SimTimer::new();
    let platform = SimPlatform::new(0, &timer);
    let kernel = Kernel::new(&cfg, &platform);
    let core0 = kernel.core(0).unwrap();
    let core1 = kernel.core(1).unwrap();
    OSStartOs(core0).unwrap();
    OSStartOs(core1).unwrap();
    timer.advance(1000);

    // a core that is done asking keeps answering until the other one is too
    let done = AtomicUsize::new(0);
    let ask = |from: OsCore<'_, '_>, to| {
        let answers: Vec<_> = (0..50)
            .map(|_| from.get_cpu_load(to, CpuLoadKind::Current))
            .collect();
        done.fetch_add(1, Ordering::SeqCst);
        while done.load(Ordering::SeqCst) < 2 {
            from.receive_messages();
            thread::yield_now();
        }
        answers
    };
    thread::scope(|s| {
        let asks_1 = s.spawn(|| ask(core0, 1));
        let asks_0 = s.spawn(|| ask(core1, 0));
        for answer in asks_1.join().unwrap().into_iter().chain(asks_0.join().unwrap()) {
            assert_eq!(answer, Ok(0));
        }
    });
}
