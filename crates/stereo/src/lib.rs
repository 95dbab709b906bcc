#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use stereo_image as image;

#[doc(inline)]
pub use stereo_imgproc as imgproc;

#[doc(inline)]
pub use stereo_io as io;

#[doc(inline)]
pub use stereo_3d as k3d;

#[doc(inline)]
pub use stereo_eval as eval;
