use tracing::info;

/// Things worth telling the user about. Delivery is best effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Delivered { tracking_number: String },
    PassStarted { pending: usize },
    PassFinished { delivered: usize },
    AllDelivered,
}

impl Notification {
    pub fn title(&self) -> String {
        match self {
            Notification::Delivered { tracking_number } => format!("貨號 {tracking_number}"),
            Notification::PassStarted { .. } => "🤖 自動查詢中...".to_string(),
            Notification::PassFinished { .. } => "✅ 查詢完成".to_string(),
            Notification::AllDelivered => "所有包裹已送達".to_string(),
        }
    }

    pub fn body(&self) -> String {
        match self {
            Notification::Delivered { .. } => "您的包裹已順利送達！🎉".to_string(),
            Notification::PassStarted { pending } => format!("正在查詢 {pending} 個未送達的包裹"),
            Notification::PassFinished { delivered } => format!("已有 {delivered} 個包裹送達"),
            Notification::AllDelivered => "恭喜！所有追蹤的包裹都已送達 🎉".to_string(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, n: &Notification);
}

/// Writes notifications to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, n: &Notification) {
        info!(title = %n.title(), "🔔 {}", n.body());
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: std::sync::Mutex<Vec<Notification>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn seen(&self) -> Vec<Notification> { self.seen.lock().unwrap().clone() }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&self, n: &Notification) { self.seen.lock().unwrap().push(n.clone()); }
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn notify(&self, n: &Notification) { (**self).notify(n) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivered_text() {
        let n = Notification::Delivered { tracking_number: "6714484884".into() };
        assert_eq!(n.title(), "貨號 6714484884");
        assert_eq!(n.body(), "您的包裹已順利送達！🎉");
        assert_eq!(Notification::PassStarted { pending: 3 }.body(), "正在查詢 3 個未送達的包裹");
    }
}
