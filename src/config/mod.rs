// ==========================================
// 献血决策支持系统 - 配置层
// ==========================================

pub mod report_registry;

pub use report_registry::ReportRegistry;
