// bridge.rs - Sequential plot driver with pause, stop and progress reporting
//
// Commands go out strictly one at a time. After each acknowledgment the
// driver waits out whatever is left of the physical motion before sending
// the next one. Pause and stop are only observed between strokes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::PlotterConfig;
use crate::error_handling::{PlotError, Result};
use crate::link::DeviceLink;
use crate::plan::MotionPlanner;
use crate::protocol::{Ack, DeviceCommand};
use crate::transform::PlotSegment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotState {
    Idle,
    Plotting,
    Paused,
    Homing,
    Completed,
    Stopped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotProgress {
    pub job_id: Option<Uuid>,
    /// Strokes finished so far.
    pub current: usize,
    pub total: usize,
    pub state: PlotState,
}

impl Default for PlotProgress {
    fn default() -> Self {
        Self { job_id: None, current: 0, total: 0, state: PlotState::Idle }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlotOutcome {
    pub job_id: Uuid,
    pub plotted: usize,
    pub total: usize,
    pub stopped: bool,
}

struct ControlState {
    paused: watch::Sender<bool>,
    stop: AtomicBool,
}

/// Cloneable pause/resume/stop handle for a bridge.
#[derive(Clone)]
pub struct PlotControl {
    inner: Arc<ControlState>,
}

impl PlotControl {
    fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            inner: Arc::new(ControlState { paused, stop: AtomicBool::new(false) }),
        }
    }

    pub fn pause(&self) {
        self.inner.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.inner.paused.send_replace(false);
    }

    /// Abort after the stroke in flight; also releases a pause.
    pub fn stop(&self) {
        self.inner.stop.store(true, Ordering::Release);
        self.resume();
    }

    pub fn is_paused(&self) -> bool {
        *self.inner.paused.borrow()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stop.load(Ordering::Acquire)
    }

    fn reset(&self) {
        self.inner.stop.store(false, Ordering::Release);
        self.resume();
    }

    async fn wait_while_paused(&self) {
        let mut rx = self.inner.paused.subscribe();
        // The sender lives as long as `self`, so this only returns on resume.
        let _ = rx.wait_for(|paused| !*paused).await;
    }
}

/// Held for the duration of a job; releases the busy flag on drop.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PlotError::AlreadyPlotting)?;
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PlotterBridge {
    config: PlotterConfig,
    link: Mutex<Option<DeviceLink>>,
    busy: AtomicBool,
    control: PlotControl,
    progress: watch::Sender<PlotProgress>,
}

impl PlotterBridge {
    pub fn new(config: PlotterConfig) -> Result<Self> {
        config.validate()?;
        let (progress, _) = watch::channel(PlotProgress::default());
        Ok(Self {
            config,
            link: Mutex::new(None),
            busy: AtomicBool::new(false),
            control: PlotControl::new(),
            progress,
        })
    }

    pub fn config(&self) -> &PlotterConfig {
        &self.config
    }

    pub fn control(&self) -> PlotControl {
        self.control.clone()
    }

    pub fn progress(&self) -> watch::Receiver<PlotProgress> {
        self.progress.subscribe()
    }

    pub fn is_plotting(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Attach a transport and query the firmware version.
    pub async fn connect(&self, mut link: DeviceLink) -> Result<String> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        let version = match link.send(&DeviceCommand::Version).await? {
            Ack::Text(version) => version,
            _ => String::from("unknown"),
        };
        log::info!("Plotter firmware: {version}");
        *self.link.lock().await = Some(link);
        Ok(version)
    }

    pub async fn connect_tcp(&self, addr: &str) -> Result<String> {
        let link = DeviceLink::connect_tcp(addr, self.config.ack_timeout()).await?;
        self.connect(link).await
    }

    pub async fn disconnect(&self) -> Result<()> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        if let Some(mut link) = self.link.lock().await.take() {
            link.send(&DeviceCommand::Motors(false)).await?;
        }
        Ok(())
    }

    /// Raise, lower and raise the pen once. Returns the firmware version.
    pub async fn test_pen(&self) -> Result<String> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        let mut guard = self.link.lock().await;
        let link = guard.as_mut().ok_or(PlotError::NotConnected)?;

        let version = match link.send(&DeviceCommand::Version).await? {
            Ack::Text(version) => version,
            _ => String::from("unknown"),
        };
        let mut planner = MotionPlanner::new(&self.config);
        let mut commands = planner.preamble();
        let down = PlotSegment {
            start: Default::default(),
            end: Default::default(),
            height: self.config.pen_down_height,
        };
        commands.extend(planner.segment(&down));
        commands.extend(planner.finish());
        execute(link, &commands).await?;
        log::info!("Pen test finished on {version}");
        Ok(version)
    }

    /// Draw `segments` in order. Only one job runs at a time; a second call
    /// while plotting fails with `AlreadyPlotting`.
    pub async fn plot(&self, segments: &[PlotSegment]) -> Result<PlotOutcome> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        let mut guard = self.link.lock().await;
        let link = guard.as_mut().ok_or(PlotError::NotConnected)?;

        self.control.reset();
        let job_id = Uuid::new_v4();
        let total = segments.len();
        log::info!("Plot job {job_id} started: {total} strokes");
        self.publish(job_id, 0, total, PlotState::Plotting);

        match self.drive(link, job_id, segments).await {
            Ok(outcome) => {
                let state = if outcome.stopped { PlotState::Stopped } else { PlotState::Completed };
                self.publish(job_id, outcome.plotted, total, state);
                log::info!("Plot job {job_id} {state:?} after {}/{total} strokes", outcome.plotted);
                Ok(outcome)
            }
            Err(err) => {
                let current = self.progress.borrow().current;
                self.publish(job_id, current, total, PlotState::Failed);
                log::error!("Plot job {job_id} failed: {err}");
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        link: &mut DeviceLink,
        job_id: Uuid,
        segments: &[PlotSegment],
    ) -> Result<PlotOutcome> {
        let total = segments.len();
        let mut planner = MotionPlanner::new(&self.config);
        execute(link, &planner.preamble()).await?;

        let mut plotted = 0;
        for segment in segments {
            if self.control.is_paused() {
                self.publish(job_id, plotted, total, PlotState::Paused);
                log::info!("Plot job {job_id} paused at {plotted}/{total}");
                self.control.wait_while_paused().await;
                self.publish(job_id, plotted, total, PlotState::Plotting);
            }
            if self.control.is_stopped() {
                break;
            }
            execute(link, &planner.segment(segment)).await?;
            plotted += 1;
            self.publish(job_id, plotted, total, PlotState::Plotting);
        }

        let stopped = plotted < total;
        self.publish(job_id, plotted, total, PlotState::Homing);
        execute(link, &planner.finish()).await?;
        Ok(PlotOutcome { job_id, plotted, total, stopped })
    }

    fn publish(&self, job_id: Uuid, current: usize, total: usize, state: PlotState) {
        self.progress.send_replace(PlotProgress { job_id: Some(job_id), current, total, state });
    }
}

/// Send each command and wait out its motion before the next one.
async fn execute(link: &mut DeviceLink, commands: &[DeviceCommand]) -> Result<()> {
    for command in commands {
        let sent = Instant::now();
        link.send(command).await?;
        let remaining = command.duration().saturating_sub(sent.elapsed());
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_core::Point;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::io::{duplex, split, AsyncBufReadExt, AsyncWriteExt, BufReader};

    type Log = Arc<StdMutex<Vec<String>>>;

    /// Controller stand-in: records each command and answers `OK`, or the
    /// version banner for `V`, or `reject` verbatim for commands with that prefix.
    fn fake_device(reject: Option<(&'static str, &'static str)>) -> (DeviceLink, Log) {
        let (client, server) = duplex(4096);
        let log: Log = Arc::new(StdMutex::new(Vec::new()));
        let seen = log.clone();
        tokio::spawn(async move {
            let (r, mut w) = split(server);
            let mut r = BufReader::new(r);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match r.read_until(b'\r', &mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                let cmd = String::from_utf8_lossy(&buf).trim().to_string();
                let reply = match reject {
                    Some((prefix, answer)) if cmd.starts_with(prefix) => answer,
                    _ if cmd == "V" => "EBBv13_and_above Firmware Version 2.8.1",
                    _ => "OK",
                };
                seen.lock().unwrap().push(cmd);
                if w.write_all(format!("{reply}\r\n").as_bytes()).await.is_err() {
                    break;
                }
            }
        });
        let (r, w) = split(client);
        (DeviceLink::new(r, w, Duration::from_millis(500)), log)
    }

    fn strokes(n: usize) -> Vec<PlotSegment> {
        // Alternating gaps force pen lifts between pairs.
        (0..n)
            .map(|i| {
                let x = (i / 2) as f64 * 10.0 + (i % 2) as f64;
                PlotSegment {
                    start: Point::new(x, 5.0),
                    end: Point::new(x + 1.0, 5.0),
                    height: 0.0,
                }
            })
            .collect()
    }

    async fn connected_bridge(
        reject: Option<(&'static str, &'static str)>,
    ) -> (Arc<PlotterBridge>, Log) {
        let bridge = Arc::new(PlotterBridge::new(PlotterConfig::default()).unwrap());
        let (link, log) = fake_device(reject);
        let version = bridge.connect(link).await.unwrap();
        assert!(version.contains("2.8.1"));
        (bridge, log)
    }

    #[tokio::test(start_paused = true)]
    async fn test_plot_runs_to_completion() {
        let (bridge, log) = connected_bridge(None).await;
        let outcome = bridge.plot(&strokes(6)).await.unwrap();
        assert_eq!(outcome.plotted, 6);
        assert!(!outcome.stopped);

        let progress = bridge.progress().borrow().clone();
        assert_eq!(progress.current, 6);
        assert_eq!(progress.state, PlotState::Completed);
        assert_eq!(progress.job_id, Some(outcome.job_id));

        let log = log.lock().unwrap();
        assert_eq!(log[0], "V");
        assert_eq!(log[1], "EM,1,1");
        assert!(log.iter().any(|c| c.starts_with("HM,")));
        assert_eq!(log.last().map(String::as_str), Some("EM,0,0"));
        assert!(!bridge.is_plotting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_plot_without_device_fails() {
        let bridge = PlotterBridge::new(PlotterConfig::default()).unwrap();
        assert!(matches!(bridge.plot(&strokes(1)).await, Err(PlotError::NotConnected)));
        assert!(matches!(bridge.test_pen().await, Err(PlotError::NotConnected)));
        assert!(!bridge.is_plotting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_job_is_rejected_while_plotting() {
        let (bridge, _log) = connected_bridge(None).await;
        let mut progress = bridge.progress();
        let job = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.plot(&strokes(20)).await })
        };
        progress.wait_for(|p| p.current >= 1).await.unwrap();

        assert!(bridge.is_plotting());
        assert!(matches!(bridge.plot(&strokes(1)).await, Err(PlotError::AlreadyPlotting)));
        assert!(matches!(bridge.test_pen().await, Err(PlotError::AlreadyPlotting)));

        let outcome = job.await.unwrap().unwrap();
        assert_eq!(outcome.plotted, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_holds_until_resumed() {
        let (bridge, log) = connected_bridge(None).await;
        let control = bridge.control();
        let mut progress = bridge.progress();
        let job = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.plot(&strokes(10)).await })
        };
        progress.wait_for(|p| p.current >= 2).await.unwrap();
        control.pause();
        let paused_at = progress.wait_for(|p| p.state == PlotState::Paused).await.unwrap().current;

        let sent = log.lock().unwrap().len();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(log.lock().unwrap().len(), sent, "no commands while paused");
        assert_eq!(bridge.progress().borrow().current, paused_at);

        control.resume();
        let outcome = job.await.unwrap().unwrap();
        assert_eq!(outcome.plotted, 10);
        assert!(!outcome.stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_lifts_pen_and_homes() {
        let (bridge, log) = connected_bridge(None).await;
        let control = bridge.control();
        let mut progress = bridge.progress();
        let job = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.plot(&strokes(40)).await })
        };
        progress.wait_for(|p| p.current >= 3).await.unwrap();
        control.stop();

        let outcome = job.await.unwrap().unwrap();
        assert!(outcome.stopped);
        assert!(outcome.plotted < 40);
        assert_eq!(bridge.progress().borrow().state, PlotState::Stopped);

        let config = bridge.config();
        let up = format!("S2,{},4", config.servo_position(config.pen_up_height));
        let log = log.lock().unwrap();
        let n = log.len();
        assert_eq!(log[n - 1], "EM,0,0");
        assert!(log[n - 2].starts_with("HM,"));
        assert_eq!(log[n - 3], up);

        // A stopped bridge accepts the next job.
        drop(log);
        assert!(!bridge.is_plotting());
        assert_eq!(bridge.plot(&strokes(2)).await.unwrap().plotted, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_error_fails_the_job() {
        let (bridge, _log) = connected_bridge(Some(("SM,", "!8 Err: Unknown command"))).await;
        let err = bridge.plot(&strokes(3)).await.unwrap_err();
        assert!(matches!(err, PlotError::UnexpectedResponse { .. }), "{err:?}");
        assert_eq!(bridge.progress().borrow().state, PlotState::Failed);
        assert!(!bridge.is_plotting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pen_test_cycles_the_servo() {
        let (bridge, log) = connected_bridge(None).await;
        let version = bridge.test_pen().await.unwrap();
        assert!(version.starts_with("EBB"));

        let config = bridge.config();
        let up = format!("S2,{},4", config.servo_position(config.pen_up_height));
        let down = format!("S2,{},4", config.servo_position(config.pen_down_height));
        let log = log.lock().unwrap();
        let pen: Vec<&String> = log.iter().filter(|c| c.starts_with("S2,")).collect();
        assert_eq!(pen, vec![&up, &down, &up]);
        assert!(!log.iter().any(|c| c.starts_with("SM,")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_motion_time_is_waited_out() {
        let (bridge, _log) = connected_bridge(None).await;
        // One 11 mm stroke from home: 880 steps travel-free at 1100 steps/s.
        let stroke = PlotSegment {
            start: Point::new(0.0, 0.0),
            end: Point::new(11.0, 0.0),
            height: 0.0,
        };
        let started = Instant::now();
        bridge.plot(&[stroke]).await.unwrap();
        let elapsed = started.elapsed();
        // Pen up (preamble), pen down, 800 ms draw, pen up, 800 ms home.
        assert!(elapsed >= Duration::from_millis(3 * 300 + 800 + 800), "{elapsed:?}");
    }
}
