use std::sync::Arc;

use crate::{
    db::{DbPool, OrmConn},
    payments::PixCheckout,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub pix: Arc<PixCheckout>,
    pub jwt_secret: Arc<str>,
}
