mod http;
mod media;

pub use self::http::{
    HttpClient, HttpError, HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpResult,
    ValidatedUrl, MAX_TIMEOUT_MS,
};

#[cfg(feature = "http-client")]
pub use self::http::ReqwestHttpClient;

pub use self::media::{
    AspectRatio, CaptureConfig, DeviceCapability, FsPhotoSource, ImageFormat, LocationAccuracy,
    LocationOutcome, LocationResult, MediaAdapter, MediaError, MediaSource, PhotoData,
    PhotoOutcome, PhotoResult, PhotoSource,
};
