// ============================================================================
// Services - one per aggregate, authorization applied against the Caller
// ============================================================================

pub mod command_handler;
pub mod firma;
pub mod ihale;
pub mod malzeme;
pub mod notification;
pub mod siparis;
pub mod user;

use std::sync::Arc;

use crate::metrics::Metrics;
use crate::store::Stores;

pub use command_handler::CommandHandler;
pub use firma::FirmaService;
pub use ihale::IhaleService;
pub use malzeme::MalzemeService;
pub use notification::{notifications_for, NotificationService};
pub use siparis::SiparisService;
pub use user::UserService;

#[derive(Clone)]
pub struct Services {
    pub firmalar: FirmaService,
    pub malzemeler: MalzemeService,
    pub ihaleler: IhaleService,
    pub siparisler: SiparisService,
    pub users: UserService,
    pub notifications: NotificationService,
    pub stores: Stores,
    pub metrics: Arc<Metrics>,
}

impl Services {
    pub fn new(stores: Stores, metrics: Arc<Metrics>) -> Self {
        let users = UserService::new(stores.users.clone(), stores.firmalar.clone(), metrics.clone());
        let firmalar = FirmaService::new(stores.firmalar.clone(), users.clone(), metrics.clone());
        let malzemeler = MalzemeService::new(stores.malzemeler.clone(), firmalar.clone(), metrics.clone());
        let siparisler = SiparisService::new(stores.siparisler.clone(), firmalar.clone(), metrics.clone());
        let ihaleler = IhaleService::new(
            stores.ihaleler.clone(),
            firmalar.clone(),
            siparisler.clone(),
            metrics.clone(),
        );
        let notifications = NotificationService::new(stores.notifications.clone());

        Self { firmalar, malzemeler, ihaleler, siparisler, users, notifications, stores, metrics }
    }
}
