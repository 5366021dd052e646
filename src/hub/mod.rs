//! 广播中枢：观察者连接管理与账本事件扇出
//!
//! 每个观察者持有一条无界 mpsc 队列，发布方把序列化好的 JSON 推进队列即返回：
//! 慢观察者只会堆积自己的队列，不会拖慢其他观察者或发布方。发送失败
//! （对端已断开）立即注销该观察者，不重试、不为迟到者缓存历史事件——
//! 迟到者应先取快照再订阅，接受边界处可能的少量重复或缺口。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, RwLock};

use crate::conversation::types::Envelope;

/// 订阅范围：全局（所有会话）或单一会话
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverScope {
    Global,
    Conversation(String),
}

impl ObserverScope {
    fn matches(&self, conversation_id: &str) -> bool {
        match self {
            ObserverScope::Global => true,
            ObserverScope::Conversation(id) => id == conversation_id,
        }
    }
}

/// 观察者连接：订阅范围 + 发送端
struct Observer {
    scope: ObserverScope,
    tx: mpsc::UnboundedSender<String>,
}

/// 订阅句柄：注销用的 id 与事件接收端
pub struct Subscription {
    pub id: u64,
    pub rx: mpsc::UnboundedReceiver<String>,
}

/// 广播中枢
#[derive(Default)]
pub struct BroadcastHub {
    observers: RwLock<HashMap<u64, Observer>>,
    next_id: AtomicU64,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅账本事件，返回订阅句柄
    pub async fn subscribe(&self, scope: ObserverScope) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.observers
            .write()
            .await
            .insert(id, Observer { scope, tx });

        Subscription { id, rx }
    }

    /// 注销观察者
    pub async fn unsubscribe(&self, id: u64) {
        self.observers.write().await.remove(&id);
    }

    /// 把一个账本事件推给所有范围匹配的观察者
    ///
    /// 只序列化一次；单个观察者发送失败不影响其余观察者，失败者随即被移除。
    pub async fn publish(&self, conversation_id: &str, envelope: &Envelope) {
        let json = match serde_json::to_string(envelope) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!("Failed to serialize envelope: {}", e);
                return;
            }
        };

        let mut dead = Vec::new();
        {
            let observers = self.observers.read().await;
            for (id, observer) in observers.iter() {
                if observer.scope.matches(conversation_id) && observer.tx.send(json.clone()).is_err()
                {
                    dead.push(*id);
                }
            }
        }

        if !dead.is_empty() {
            let mut observers = self.observers.write().await;
            for id in dead {
                observers.remove(&id);
                tracing::debug!("Removed disconnected observer {}", id);
            }
        }
    }

    /// 当前观察者数
    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }
}
