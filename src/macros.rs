pub use cfsubmit_util::regex;
