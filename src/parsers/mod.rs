pub mod html_keys;
