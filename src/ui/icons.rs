pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const PIN: &str = "📌";
    pub const FILE: &str = "📄";
    pub const LOCK: &str = "🔒";
    pub const LINK: &str = "🔗";
    pub const DATABASE: &str = "🗄️";
    pub const EMPTY: &str = "∅";
}
