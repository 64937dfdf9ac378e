use hostlink_core::{Address, EndCode, ReadRequest, WriteSequence, decode_response, encode_response};

fn main() {
    let address: Address = "HR5.06".parse().expect("sample address should parse");

    let request = ReadRequest::for_address(&address).expect("HR5 is a valid read target");
    println!("read frame:     {}", request.frame());

    let sequence = WriteSequence::for_address(&address, true).expect("HR bits are writable");
    println!("write sequence: {sequence}");

    let response = encode_response(address.area.read_opcode(), EndCode::Normal, "0040") + "\r";
    let value = decode_response(&response, &request.command(), address.bit)
        .expect("response echoes the command header");
    println!("{address} = {value} (from {})", response.trim_end());
}
