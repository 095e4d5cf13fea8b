// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 文档存储实现
pub mod in_memory;
pub mod sea_orm_store;
