pub mod ad_worker;
pub mod creative;
pub mod meta_ads;
pub mod meta_auth;
pub mod templates;
pub mod video;

pub use ad_worker::AdWorker;
pub use creative::{AdImageService, CreativeError};
pub use meta_ads::{AdEdge, AdResult, AdService, CampaignConfig, MetaAdRequest, MetaAdsApi, MetaError};
pub use meta_auth::{link_account, AppCredentials, MetaAppConfig, MetaOAuth};
pub use video::{
    MockModelRenderer, ModelRenderer, SpeechSynth, Timeline, VideoError, VideoRenderer,
    VideoRequest, VideoService,
};
