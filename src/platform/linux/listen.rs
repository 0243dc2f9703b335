//! Per-device reader threads.
//!
//! Each grabbed device gets its own thread that polls the device fd with a
//! timeout, so a stop request is noticed within one poll interval.

use crate::error::{Error, Result};
use crate::event::{KeyEvent, KeyValue};
use evdev::{Device, EventType};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc;

/// A running reader. Joining it hands the device back.
pub(crate) struct Reader<D = Device> {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<D>,
}

impl<D> Reader<D> {
    /// Ask the thread to stop without waiting for it.
    pub(crate) fn signal(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Whether the thread has returned, on request or after a disconnect.
    pub(crate) fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Ask the thread to stop and wait for it.
    pub(crate) fn join(self) -> Result<D> {
        self.signal();
        self.thread
            .join()
            .map_err(|_| Error::ThreadError("device reader panicked".into()))
    }
}

/// Start reading `device` on a new thread.
pub(crate) fn spawn_reader(
    device: Device,
    path: PathBuf,
    name: String,
    queue: mpsc::Sender<KeyEvent>,
    poll_interval: Duration,
) -> Result<Reader> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let thread_name = format!(
        "optmap-{}",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );

    let thread = thread::Builder::new()
        .name(thread_name)
        .spawn(move || read_loop(device, Arc::new(path), &name, &queue, &flag, poll_interval))
        .map_err(|e| Error::ThreadError(format!("failed to spawn reader: {}", e)))?;

    Ok(Reader { stop, thread })
}

/// Why a reader stopped.
#[derive(Debug, PartialEq, Eq)]
enum Exit {
    Stopped,
    Disconnected,
    QueueClosed,
}

fn read_loop(
    mut device: Device,
    path: Arc<PathBuf>,
    name: &str,
    queue: &mpsc::Sender<KeyEvent>,
    stop: &AtomicBool,
    poll_interval: Duration,
) -> Device {
    let timeout = poll_interval.as_millis().min(i32::MAX as u128) as i32;
    log::debug!("reader started for {}", name);

    let exit = loop {
        if stop.load(Ordering::SeqCst) {
            break Exit::Stopped;
        }

        let mut pfd = libc::pollfd {
            fd: device.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let ret = unsafe { libc::poll(&mut pfd, 1, timeout) };

        if ret < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            log::error!("poll failed on {}: {}", name, err);
            break Exit::Disconnected;
        }

        if ret == 0 {
            continue;
        }

        if pfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
            break Exit::Disconnected;
        }

        if pfd.revents & libc::POLLIN == 0 {
            continue;
        }

        let events: Vec<KeyEvent> = match device.fetch_events() {
            Ok(events) => events
                .filter(|ev| ev.event_type() == EventType::KEY)
                .filter_map(|ev| {
                    let value = KeyValue::from_raw(ev.value())?;
                    Some(KeyEvent {
                        code: ev.code(),
                        value,
                        device: Arc::clone(&path),
                        time: ev.timestamp(),
                    })
                })
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                if e.raw_os_error() != Some(libc::ENODEV) {
                    log::error!("read failed on {}: {}", name, e);
                }
                break Exit::Disconnected;
            }
        };

        if publish(queue, events) == Err(Exit::QueueClosed) {
            break Exit::QueueClosed;
        }
    };

    match exit {
        Exit::Stopped => log::debug!("reader for {} stopped", name),
        Exit::Disconnected => log::error!("device disconnected: {}", name),
        Exit::QueueClosed => log::debug!("queue closed, reader for {} exiting", name),
    }

    device
}

/// Push events onto the queue, blocking while it is full.
fn publish(queue: &mpsc::Sender<KeyEvent>, events: Vec<KeyEvent>) -> std::result::Result<(), Exit> {
    for event in events {
        queue.blocking_send(event).map_err(|_| Exit::QueueClosed)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_preserves_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let events = vec![KeyEvent::press(30), KeyEvent::release(30), KeyEvent::press(48)];
        assert_eq!(publish(&tx, events.clone()), Ok(()));

        for expected in events {
            let got = rx.try_recv().unwrap();
            assert_eq!((got.code, got.value), (expected.code, expected.value));
        }
    }

    #[test]
    fn test_publish_reports_closed_queue() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        assert_eq!(
            publish(&tx, vec![KeyEvent::press(30)]),
            Err(Exit::QueueClosed)
        );
    }

    fn fake_reader(tick: Duration) -> Reader<u32> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = thread::spawn(move || {
            let mut ticks = 0;
            while !flag.load(Ordering::SeqCst) {
                thread::sleep(tick);
                ticks += 1;
            }
            ticks
        });
        Reader { stop, thread }
    }

    #[test]
    fn test_signal_all_then_join_overlaps_waits() {
        let tick = Duration::from_millis(200);
        let readers: Vec<_> = (0..5).map(|_| fake_reader(tick)).collect();
        thread::sleep(Duration::from_millis(50));

        let start = std::time::Instant::now();
        for reader in &readers {
            reader.signal();
        }
        for reader in readers {
            reader.join().unwrap();
        }
        // Joined one by one without signalling first this takes about 5 ticks.
        assert!(start.elapsed() < tick * 3, "took {:?}", start.elapsed());
    }

    #[test]
    fn test_finished_reader_reported() {
        let stop = Arc::new(AtomicBool::new(false));
        let reader = Reader {
            stop,
            thread: thread::spawn(|| 7u32),
        };
        while !reader.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(reader.join().unwrap(), 7);
    }

    #[test]
    fn test_publish_blocks_until_room() {
        let (tx, mut rx) = mpsc::channel(1);
        let producer = thread::spawn(move || {
            publish(&tx, (30..35).map(KeyEvent::press).collect())
        });

        let mut codes = Vec::new();
        while codes.len() < 5 {
            if let Some(event) = rx.blocking_recv() {
                codes.push(event.code);
            }
        }
        assert_eq!(producer.join().unwrap(), Ok(()));
        assert_eq!(codes, vec![30, 31, 32, 33, 34]);
    }
}
