// ==========================================
// 集成测试共享替身
// ==========================================

#![allow(dead_code)]

pub mod in_memory_catalog;
pub mod mock_config;
