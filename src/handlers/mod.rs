// handlers/mod.rs - HTTP surface
//
// Public (no auth): /health
// Protected (JWT):  /api/users/*

pub mod users;
