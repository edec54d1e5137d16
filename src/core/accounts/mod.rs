pub mod accounts_service;

pub use accounts_service::{
    AccountError, AccountService, MetaLink, MetaTokenStore, ModelRegistry, TokenIssuer,
    UserModel, UserStore,
};
