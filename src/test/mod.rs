mod abm;
mod network;
mod packet;
mod routing;
mod voq;
