pub mod bus_clients;
