//! 读卡器生命周期状态机
//!
//! `Disconnected → Connected → CardPresent → Connected`，
//! 驱动事件进，通知出；同一张卡在场期间重复的插卡事件被忽略。

use crate::scanner::ScanReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderState {
    #[default]
    Disconnected,
    Connected,
    CardPresent,
}

/// 读卡器驱动上报的原始事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    Attached { name: String },
    CardInserted,
    CardRemoved,
    Detached,
}

/// 状态迁移产生的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderNotice {
    ReaderConnected { name: String },
    /// 需要执行一次扫描
    ScanRequested,
    CardRemoved,
    ReaderDisconnected { name: String },
}

/// 读卡器监听任务发给代理主循环的消息
#[derive(Debug, Clone)]
pub enum ReaderUpdate {
    Connected { reader_name: String },
    Disconnected { reader_name: String },
    Scanned(ScanReport),
    CardRemoved,
}

#[derive(Debug, Default)]
pub struct ReaderStateMachine {
    state: ReaderState,
    reader_name: Option<String>,
}

impl ReaderStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn reader_name(&self) -> Option<&str> {
        self.reader_name.as_deref()
    }

    /// 处理一个事件，返回需要对外发出的通知（按顺序）。
    pub fn handle(&mut self, event: ReaderEvent) -> Vec<ReaderNotice> {
        match (self.state, event) {
            (ReaderState::Disconnected, ReaderEvent::Attached { name }) => {
                self.state = ReaderState::Connected;
                self.reader_name = Some(name.clone());
                vec![ReaderNotice::ReaderConnected { name }]
            }
            (ReaderState::Connected, ReaderEvent::CardInserted) => {
                self.state = ReaderState::CardPresent;
                vec![ReaderNotice::ScanRequested]
            }
            (ReaderState::CardPresent, ReaderEvent::CardRemoved) => {
                self.state = ReaderState::Connected;
                vec![ReaderNotice::CardRemoved]
            }
            (ReaderState::Connected | ReaderState::CardPresent, ReaderEvent::Detached) => {
                let was_present = self.state == ReaderState::CardPresent;
                self.state = ReaderState::Disconnected;
                let name = self.reader_name.take().unwrap_or_default();
                let mut notices = Vec::with_capacity(2);
                if was_present {
                    notices.push(ReaderNotice::CardRemoved);
                }
                notices.push(ReaderNotice::ReaderDisconnected { name });
                notices
            }
            // 其余组合（重复插卡、未连接时的卡事件等）不改变状态
            _ => Vec::new(),
        }
    }
}
