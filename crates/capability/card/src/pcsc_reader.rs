//! PC/SC 读卡器绑定
//!
//! PC/SC 调用是阻塞的，监听循环跑在独立线程里，通过 `blocking_send` 把
//! [`ReaderUpdate`] 交给异步主循环。一次只跟踪一个读卡器。

use std::ffi::{CStr, CString};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use pcsc::{Card, Context, Protocols, ReaderState as PcscReaderState, Scope, ShareMode, State};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::apdu::bytes_to_hex;
use crate::error::CardError;
use crate::reader::{ReaderEvent, ReaderNotice, ReaderStateMachine, ReaderUpdate};
use crate::scanner::{CardChannel, scan};

const POLL_TIMEOUT: Duration = Duration::from_secs(1);

impl From<pcsc::Error> for CardError {
    fn from(err: pcsc::Error) -> Self {
        match err {
            pcsc::Error::NoReadersAvailable | pcsc::Error::ReaderUnavailable => CardError::NoReader,
            other => CardError::Pcsc(other.to_string()),
        }
    }
}

/// 已连接卡片上的 APDU 通道
pub struct PcscChannel {
    card: Card,
    atr: String,
}

impl PcscChannel {
    pub fn connect(context: &Context, reader: &CStr) -> Result<Self, CardError> {
        let card = context.connect(reader, ShareMode::Shared, Protocols::ANY)?;
        let atr = card
            .get_attribute_owned(pcsc::Attribute::AtrString)
            .map(|bytes| bytes_to_hex(&bytes))
            .unwrap_or_default();
        Ok(Self { card, atr })
    }
}

impl CardChannel for PcscChannel {
    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>, CardError> {
        let mut buffer = [0u8; pcsc::MAX_BUFFER_SIZE];
        let response = self
            .card
            .transmit(command, &mut buffer)
            .map_err(|err| CardError::Transport(err.to_string()))?;
        Ok(response.to_vec())
    }

    fn atr(&self) -> String {
        self.atr.clone()
    }
}

/// 启动读卡器监听线程；`stop` 置位后线程在下一个轮询周期退出。
pub fn spawn_reader_monitor(
    aids: Vec<String>,
    updates: mpsc::Sender<ReaderUpdate>,
    stop: Arc<AtomicBool>,
) -> Result<JoinHandle<()>, CardError> {
    let context = Context::establish(Scope::User)?;
    let handle = std::thread::Builder::new()
        .name("fm-reader-monitor".to_string())
        .spawn(move || {
            if let Err(err) = monitor_loop(&context, &aids, &updates, &stop) {
                warn!(target: "fm.card", error = %err, "reader_monitor_stopped");
            }
        })
        .map_err(|err| CardError::Pcsc(err.to_string()))?;
    Ok(handle)
}

fn monitor_loop(
    context: &Context,
    aids: &[String],
    updates: &mpsc::Sender<ReaderUpdate>,
    stop: &AtomicBool,
) -> Result<(), CardError> {
    let mut machine = ReaderStateMachine::new();
    let mut tracked: Option<PcscReaderState> = None;

    while !stop.load(Ordering::Relaxed) {
        if tracked.is_none() {
            match first_reader(context)? {
                Some(name) => {
                    let reader_state = PcscReaderState::new(name.clone(), State::UNAWARE);
                    let event = ReaderEvent::Attached {
                        name: name.to_string_lossy().into_owned(),
                    };
                    tracked = Some(reader_state);
                    if !deliver(&mut machine, event, context, &name, aids, updates) {
                        break;
                    }
                }
                None => {
                    std::thread::sleep(POLL_TIMEOUT);
                    continue;
                }
            }
        }

        let Some(reader_state) = tracked.as_mut() else {
            continue;
        };
        reader_state.sync_current_state();
        match context.get_status_change(POLL_TIMEOUT, std::slice::from_mut(reader_state)) {
            Ok(()) => {}
            Err(pcsc::Error::Timeout) => continue,
            Err(err) => return Err(err.into()),
        }

        let name = reader_state.name().to_owned();
        let event_state = reader_state.event_state();
        let event = if event_state.intersects(State::UNKNOWN | State::IGNORE) {
            tracked = None;
            ReaderEvent::Detached
        } else if event_state.contains(State::PRESENT) {
            ReaderEvent::CardInserted
        } else {
            ReaderEvent::CardRemoved
        };
        if !deliver(&mut machine, event, context, &name, aids, updates) {
            break;
        }
    }
    Ok(())
}

fn first_reader(context: &Context) -> Result<Option<CString>, CardError> {
    match context.list_readers_owned() {
        Ok(readers) => Ok(readers.into_iter().next()),
        Err(pcsc::Error::NoReadersAvailable) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn deliver(
    machine: &mut ReaderStateMachine,
    event: ReaderEvent,
    context: &Context,
    reader: &CStr,
    aids: &[String],
    updates: &mpsc::Sender<ReaderUpdate>,
) -> bool {
    for notice in machine.handle(event) {
        let update = match notice {
            ReaderNotice::ReaderConnected { name } => {
                info!(target: "fm.card", reader = %name, "reader_connected");
                ReaderUpdate::Connected { reader_name: name }
            }
            ReaderNotice::ReaderDisconnected { name } => {
                info!(target: "fm.card", reader = %name, "reader_disconnected");
                ReaderUpdate::Disconnected { reader_name: name }
            }
            ReaderNotice::CardRemoved => ReaderUpdate::CardRemoved,
            ReaderNotice::ScanRequested => match PcscChannel::connect(context, reader) {
                Ok(mut channel) => ReaderUpdate::Scanned(scan(&mut channel, aids)),
                Err(err) => {
                    warn!(target: "fm.card", error = %err, "card_connect_failed");
                    continue;
                }
            },
        };
        // 接收端关闭说明代理正在退出
        if updates.blocking_send(update).is_err() {
            return false;
        }
    }
    true
}
