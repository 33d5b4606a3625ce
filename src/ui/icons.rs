//! Shared UI icons and emojis.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[FAIL]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");

// Chat indicators
pub static MISSION: Emoji<'_, '_> = Emoji("📋 ", "[MISSION]");
pub static SPEECH: Emoji<'_, '_> = Emoji("💬 ", ">");
pub static USER: Emoji<'_, '_> = Emoji("🙋 ", "you>");
pub static SYSTEM: Emoji<'_, '_> = Emoji("🔔 ", "[SYS]");

// Review indicators
pub static REVIEW: Emoji<'_, '_> = Emoji("🔍 ", "[R]");
pub static HINT: Emoji<'_, '_> = Emoji("💡 ", "[HINT]");
pub static HEART: Emoji<'_, '_> = Emoji("❤️  ", "<3");
