//! Wire-format parsers for the IP, UDP, and syslog layers.

pub mod packet;
